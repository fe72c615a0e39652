//! In-order channel bridge backed by an unbounded tokio mpsc channel

use tokio::sync::mpsc;

use crate::error::{BridgeError, Result};
use crate::{Bridge, BridgeMessage};

/// Sending half; cheap to clone
#[derive(Debug, Clone)]
pub struct ChannelBridge {
    sender: mpsc::UnboundedSender<BridgeMessage>,
}

/// Receiving half
#[derive(Debug)]
pub struct BridgeReceiver {
    receiver: mpsc::UnboundedReceiver<BridgeMessage>,
}

impl ChannelBridge {
    /// Create a connected bridge/receiver pair
    pub fn channel() -> (ChannelBridge, BridgeReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (ChannelBridge { sender }, BridgeReceiver { receiver })
    }

    /// Whether the receiving side is still alive
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }
}

impl Bridge for ChannelBridge {
    fn send(&self, message: BridgeMessage) -> Result<()> {
        self.sender
            .send(message)
            .map_err(|err| BridgeError::Closed(err.0.event))
    }
}

impl BridgeReceiver {
    /// Wait for the next message; `None` once every sender is dropped
    pub async fn recv(&mut self) -> Option<BridgeMessage> {
        self.receiver.recv().await
    }

    /// Take the next message if one is queued
    pub fn try_recv(&mut self) -> Option<BridgeMessage> {
        self.receiver.try_recv().ok()
    }

    /// Take every queued message, oldest first
    pub fn drain(&mut self) -> Vec<BridgeMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.receiver.try_recv() {
            messages.push(message);
        }
        messages
    }
}

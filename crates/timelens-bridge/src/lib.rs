//! Transport boundary for timelens
//!
//! The history core never talks to a concrete transport. It sends
//! [`BridgeMessage`]s through the [`Bridge`] trait; whoever embeds the core
//! decides whether those end up in a channel, a batch buffer or nowhere.
//!
//! # Example
//!
//! ```rust
//! use timelens_bridge::{Bridge, ChannelBridge};
//! use serde_json::json;
//!
//! let (bridge, mut receiver) = ChannelBridge::channel();
//! bridge.emit("vuex:init", json!({"state": {}})).unwrap();
//! assert_eq!(receiver.try_recv().unwrap().event, "vuex:init");
//! ```

pub mod batch;
pub mod channel;
pub mod error;
pub mod events;

pub use batch::BatchingBridge;
pub use channel::{BridgeReceiver, ChannelBridge};
pub use error::{BridgeError, Result};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single event crossing the bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeMessage {
    /// Event name, see [`events`]
    pub event: String,
    /// Event payload
    pub payload: Value,
}

impl BridgeMessage {
    pub fn new(event: impl Into<String>, payload: Value) -> Self {
        Self {
            event: event.into(),
            payload,
        }
    }
}

/// Outgoing side of a bidirectional channel.
///
/// Implementations must deliver messages in the order they were sent.
pub trait Bridge: Send + Sync {
    /// Send one message
    fn send(&self, message: BridgeMessage) -> Result<()>;

    /// Convenience wrapper around [`Bridge::send`]
    fn emit(&self, event: &str, payload: Value) -> Result<()> {
        self.send(BridgeMessage::new(event, payload))
    }

    /// Push out anything the bridge is holding back
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Bridge that drops everything; used when no panel is attached
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBridge;

impl Bridge for NullBridge {
    fn send(&self, _message: BridgeMessage) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_bridge_accepts_everything() {
        assert!(NullBridge.emit(events::MUTATION, json!(null)).is_ok());
    }

    #[test]
    fn test_message_serialization() {
        let message = BridgeMessage::new(events::INSPECTED_STATE, json!({"index": 2}));
        let text = serde_json::to_string(&message).unwrap();
        let back: BridgeMessage = serde_json::from_str(&text).unwrap();
        assert_eq!(back, message);
    }
}

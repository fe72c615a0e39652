//! Batching bridge
//!
//! Buffers outgoing messages and forwards them to an inner bridge in order,
//! either when the buffer reaches its limit or on an explicit flush.

use parking_lot::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::{Bridge, BridgeMessage};

/// Default number of buffered messages before an automatic flush
pub const DEFAULT_BATCH_SIZE: usize = 32;

pub struct BatchingBridge<B: Bridge> {
    inner: B,
    buffer: Mutex<Vec<BridgeMessage>>,
    batch_size: usize,
}

impl<B: Bridge> BatchingBridge<B> {
    pub fn new(inner: B) -> Self {
        Self::with_batch_size(inner, DEFAULT_BATCH_SIZE)
    }

    /// A batch size of zero is treated as one (every message flushes)
    pub fn with_batch_size(inner: B, batch_size: usize) -> Self {
        Self {
            inner,
            buffer: Mutex::new(Vec::new()),
            batch_size: batch_size.max(1),
        }
    }

    /// Number of messages waiting to be flushed
    pub fn pending(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }
}

impl<B: Bridge> Bridge for BatchingBridge<B> {
    fn send(&self, message: BridgeMessage) -> Result<()> {
        let full = {
            let mut buffer = self.buffer.lock();
            buffer.push(message);
            buffer.len() >= self.batch_size
        };
        if full {
            self.flush()
        } else {
            Ok(())
        }
    }

    /// Forward every buffered message to the inner bridge.
    ///
    /// Stops at the first failure: the failing message is dropped and the
    /// ones after it stay buffered.
    fn flush(&self) -> Result<()> {
        let batch: Vec<BridgeMessage> = std::mem::take(&mut *self.buffer.lock());
        if batch.is_empty() {
            return Ok(());
        }
        debug!(count = batch.len(), "flushing bridge batch");

        let mut remaining = batch.into_iter();
        while let Some(message) = remaining.next() {
            if let Err(err) = self.inner.send(message) {
                let mut buffer = self.buffer.lock();
                let newer = std::mem::take(&mut *buffer);
                buffer.extend(remaining);
                buffer.extend(newer);
                return Err(err);
            }
        }
        Ok(())
    }
}

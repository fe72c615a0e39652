//! Explicit backend context
//!
//! Everything a backend component needs is reached through a
//! [`BackendContext`] handed in by the caller. Several stores can be attached
//! to the same context; each gets its own controller sharing the bridge.

use std::sync::Arc;

use parking_lot::Mutex;
use timelens_bridge::{BatchingBridge, Bridge};
use timelens_common::init_logging;
use timelens_history::{HistoryController, Store};
use tracing::info;

use crate::error::Result;
use crate::settings::BackendSettings;

/// A controller shared between the application side and the dispatcher
pub type SharedController<S> = Arc<Mutex<HistoryController<S>>>;

/// Settings plus the outgoing bridge
#[derive(Clone)]
pub struct BackendContext {
    settings: BackendSettings,
    bridge: Arc<dyn Bridge>,
}

impl BackendContext {
    /// Context sending straight through `bridge`
    pub fn new(settings: BackendSettings, bridge: Arc<dyn Bridge>) -> Self {
        Self { settings, bridge }
    }

    /// Context buffering outgoing messages in batches of `settings.batch_size`
    pub fn batched<B: Bridge + 'static>(settings: BackendSettings, inner: B) -> Self {
        let bridge = Arc::new(BatchingBridge::with_batch_size(inner, settings.batch_size));
        Self { settings, bridge }
    }

    pub fn settings(&self) -> &BackendSettings {
        &self.settings
    }

    /// Outgoing bridge
    pub fn bridge(&self) -> Arc<dyn Bridge> {
        Arc::clone(&self.bridge)
    }

    /// Install the global subscriber at the configured level
    pub fn init_logging(&self) -> bool {
        init_logging(self.settings.log_level)
    }

    /// Start recording `store`
    pub fn attach<S: Store>(&self, store: S) -> Result<SharedController<S>> {
        let controller =
            HistoryController::new(store, self.settings.history.clone(), self.bridge())?;
        info!(
            cache_every = self.settings.history.cache_every,
            cache_limit = self.settings.history.cache_limit,
            "Attached store"
        );
        Ok(Arc::new(Mutex::new(controller)))
    }

    /// Send anything the bridge is still buffering
    pub fn flush(&self) -> Result<()> {
        self.bridge.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use timelens_bridge::{events, ChannelBridge};
    use timelens_history::{MemoryStore, ModuleDefinition};

    #[test]
    fn test_attach_sends_init() {
        let (bridge, mut receiver) = ChannelBridge::channel();
        let context = BackendContext::new(BackendSettings::default(), Arc::new(bridge));
        let controller = context
            .attach(MemoryStore::new(ModuleDefinition::new(json!({"a": 1}))))
            .unwrap();

        assert!(controller.lock().is_empty());
        assert_eq!(receiver.try_recv().unwrap().event, events::INIT);
    }

    #[test]
    fn test_batched_context_holds_until_flush() {
        let (bridge, mut receiver) = ChannelBridge::channel();
        let context = BackendContext::batched(BackendSettings::default(), bridge);
        let _controller = context
            .attach(MemoryStore::new(ModuleDefinition::new(json!({}))))
            .unwrap();

        assert!(receiver.try_recv().is_none());
        context.flush().unwrap();
        assert_eq!(receiver.drain().len(), 1);
    }

    #[test]
    fn test_attach_rejects_invalid_history_config() {
        let mut settings = BackendSettings::default();
        settings.history.cache_every = 0;
        let context = BackendContext::new(settings, Arc::new(timelens_bridge::NullBridge));
        assert!(context
            .attach(MemoryStore::new(ModuleDefinition::new(json!({}))))
            .is_err());
    }
}

//! Maps panel messages onto history controller operations

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use timelens_bridge::{events, Bridge, BridgeMessage, BridgeReceiver};
use timelens_codec::{parse, InspectValue};
use timelens_common::ValuePath;
use timelens_history::Store;
use tracing::{debug, warn};

use crate::context::{BackendContext, SharedController};
use crate::error::{BackendError, Result};

#[derive(Debug, Deserialize)]
struct TravelRequest {
    index: i64,
    #[serde(default)]
    apply: bool,
}

#[derive(Debug, Deserialize)]
struct EditRequest {
    index: i64,
    path: ValuePath,
    /// Encoded value; absent means remove
    #[serde(default)]
    value: Option<String>,
}

/// Handles incoming panel messages for one controller
pub struct Dispatcher<S: Store> {
    controller: SharedController<S>,
    bridge: Arc<dyn Bridge>,
}

impl<S: Store> Dispatcher<S> {
    pub fn new(context: &BackendContext, controller: SharedController<S>) -> Self {
        Self {
            controller,
            bridge: context.bridge(),
        }
    }

    /// Apply one message, then flush whatever it produced, error reports
    /// included
    pub fn handle(&self, message: &BridgeMessage) -> Result<()> {
        debug!(event = %message.event, "Handling panel message");
        let result = self.apply(message);
        let flushed = self.bridge.flush();
        result?;
        flushed?;
        Ok(())
    }

    fn apply(&self, message: &BridgeMessage) -> Result<()> {
        let mut controller = self.controller.lock();
        match message.event.as_str() {
            events::TRAVEL_TO_STATE => {
                let request: TravelRequest = decode(message)?;
                controller.travel_to(request.index, request.apply)?;
            }
            events::INSPECT_STATE => {
                controller.inspect(decode(message)?)?;
            }
            events::COMMIT_ALL => controller.commit_all(),
            events::REVERT_ALL => controller.revert_all(),
            events::COMMIT => controller.commit(decode(message)?)?,
            events::REVERT => controller.revert(decode(message)?)?,
            events::IMPORT_STATE => {
                let text: String = decode(message)?;
                controller.import_state(&text)?;
            }
            events::EDIT_STATE => {
                let request: EditRequest = decode(message)?;
                let value = request
                    .value
                    .map(|text| parse(&text, true).and_then(InspectValue::into_state))
                    .transpose()?;
                controller.edit_state(request.index, &request.path, value)?;
            }
            events::SET_RECORDING => controller.set_recording(decode(message)?),
            other => return Err(BackendError::UnknownEvent(other.to_string())),
        }
        Ok(())
    }

    /// Handle messages until every sender is gone; returns how many succeeded
    pub async fn run(&self, mut receiver: BridgeReceiver) -> usize {
        let mut handled = 0;
        while let Some(message) = receiver.recv().await {
            match self.handle(&message) {
                Ok(()) => handled += 1,
                Err(e) => warn!(event = %message.event, error = %e, "Failed to handle panel message"),
            }
        }
        handled
    }
}

fn decode<T: DeserializeOwned>(message: &BridgeMessage) -> Result<T> {
    serde_json::from_value(message.payload.clone())
        .map_err(|e| BackendError::invalid_message(message.event.clone(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::BackendSettings;
    use serde_json::json;
    use timelens_bridge::NullBridge;
    use timelens_history::{MemoryStore, ModuleDefinition};

    fn dispatcher() -> (Dispatcher<MemoryStore>, SharedController<MemoryStore>) {
        let context = BackendContext::new(BackendSettings::default(), Arc::new(NullBridge));
        let store = MemoryStore::new(
            ModuleDefinition::new(json!({"n": 0})).with_mutation("inc", |state, _| {
                let n = state["n"].as_i64().unwrap_or(0);
                state["n"] = json!(n + 1);
                Ok(())
            }),
        );
        let controller = context.attach(store).unwrap();
        (Dispatcher::new(&context, controller.clone()), controller)
    }

    fn message(event: &str, payload: serde_json::Value) -> BridgeMessage {
        BridgeMessage::new(event, payload)
    }

    #[test]
    fn test_unknown_event() {
        let (dispatcher, _) = dispatcher();
        assert!(matches!(
            dispatcher.handle(&message("vuex:bogus", json!(null))),
            Err(BackendError::UnknownEvent(_))
        ));
    }

    #[test]
    fn test_malformed_payload() {
        let (dispatcher, _) = dispatcher();
        assert!(matches!(
            dispatcher.handle(&message(events::COMMIT, json!("one"))),
            Err(BackendError::InvalidMessage { .. })
        ));
    }

    #[test]
    fn test_set_recording() {
        let (dispatcher, controller) = dispatcher();
        dispatcher
            .handle(&message(events::SET_RECORDING, json!(false)))
            .unwrap();
        assert!(!controller.lock().is_recording());
    }

    #[test]
    fn test_travel_and_commit() {
        let (dispatcher, controller) = dispatcher();
        for _ in 0..3 {
            controller.lock().apply_mutation("inc", json!(null)).unwrap();
        }

        dispatcher
            .handle(&message(events::TRAVEL_TO_STATE, json!({"index": 0, "apply": true})))
            .unwrap();
        assert_eq!(controller.lock().store().state(), &json!({"n": 1}));

        dispatcher.handle(&message(events::COMMIT, json!(0))).unwrap();
        assert_eq!(controller.lock().len(), 2);
    }

    #[test]
    fn test_edit_state_decodes_value() {
        let (dispatcher, controller) = dispatcher();
        dispatcher
            .handle(&message(
                events::EDIT_STATE,
                json!({"index": -1, "path": "label", "value": "\"hello\""}),
            ))
            .unwrap();
        assert_eq!(
            controller.lock().store().state(),
            &json!({"n": 0, "label": "hello"})
        );

        dispatcher
            .handle(&message(events::EDIT_STATE, json!({"index": -1, "path": ["label"]})))
            .unwrap();
        assert_eq!(controller.lock().store().state(), &json!({"n": 0}));
    }
}

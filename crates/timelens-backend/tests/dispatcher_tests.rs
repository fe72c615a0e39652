//! Panel round trips through the dispatcher run loop

use std::sync::Arc;

use serde_json::{json, Value};
use timelens_backend::{BackendContext, BackendError, BackendSettings, Dispatcher};
use timelens_bridge::{events, Bridge, BridgeMessage, ChannelBridge};
use timelens_codec::parse;
use timelens_common::ValuePath;
use timelens_history::{
    HandlerError, HistoryError, MemoryStore, ModuleDefinition, ModuleOptions, ModulePath, Store,
};

fn todo_store() -> MemoryStore {
    MemoryStore::new(
        ModuleDefinition::new(json!({"todos": []}))
            .with_mutation("add", |state, args| {
                if let (Some(todos), Some(todo)) = (state["todos"].as_array_mut(), args.first()) {
                    todos.push(todo.clone());
                }
                Ok(())
            })
            .with_getter("remaining", |local, _| {
                json!(local["todos"].as_array().map(Vec::len).unwrap_or(0))
            }),
    )
}

fn strict_counter_store() -> MemoryStore {
    MemoryStore::new(ModuleDefinition::new(json!({"n": 0})).with_mutation(
        "bump",
        |state, _| {
            let n = state["n"]
                .as_i64()
                .ok_or_else(|| HandlerError::failed("n is not a number"))?;
            state["n"] = json!(n + 1);
            Ok(())
        },
    ))
}

fn decode_snapshot(payload: &Value) -> Value {
    let text = payload["snapshot"].as_str().unwrap();
    parse(text, true).unwrap().into_state().unwrap()
}

#[tokio::test]
async fn test_run_loop_inspects_and_travels() {
    let (outgoing, mut panel) = ChannelBridge::channel();
    let context = BackendContext::new(BackendSettings::default(), Arc::new(outgoing));
    let controller = context.attach(todo_store()).unwrap();
    {
        let mut controller = controller.lock();
        controller.apply_mutation("add", json!("milk")).unwrap();
        controller.apply_mutation("add", json!("eggs")).unwrap();
    }
    panel.drain();

    let (inbound, receiver) = ChannelBridge::channel();
    inbound.emit(events::INSPECT_STATE, json!(0)).unwrap();
    inbound
        .emit(events::TRAVEL_TO_STATE, json!({"index": -1, "apply": true}))
        .unwrap();
    inbound.emit("vuex:unknown", json!(null)).unwrap();
    drop(inbound);

    let dispatcher = Dispatcher::new(&context, controller.clone());
    assert_eq!(dispatcher.run(receiver).await, 2);

    let sent = panel.drain();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|m| m.event == events::INSPECTED_STATE));
    assert_eq!(
        decode_snapshot(&sent[0].payload),
        json!({"state": {"todos": ["milk"]}, "getters": {"remaining": 1}})
    );
    assert_eq!(sent[1].payload["index"], json!(-1));
    assert_eq!(controller.lock().store().state(), &json!({"todos": []}));
}

#[tokio::test]
async fn test_import_and_revert_over_bridge() {
    let (outgoing, mut panel) = ChannelBridge::channel();
    let context = BackendContext::new(BackendSettings::default(), Arc::new(outgoing));
    let controller = context.attach(todo_store()).unwrap();
    controller.lock().apply_mutation("add", json!("a")).unwrap();

    let (inbound, receiver) = ChannelBridge::channel();
    inbound
        .emit(events::IMPORT_STATE, json!(r#"{"todos": ["x", "y"]}"#))
        .unwrap();
    inbound.emit(events::IMPORT_STATE, json!("{broken")).unwrap();
    drop(inbound);

    let dispatcher = Dispatcher::new(&context, controller.clone());
    assert_eq!(dispatcher.run(receiver).await, 1);

    let guard = controller.lock();
    assert!(guard.is_empty());
    assert_eq!(guard.store().state(), &json!({"todos": ["x", "y"]}));
    drop(guard);

    let sent: Vec<String> = panel.drain().into_iter().map(|m| m.event).collect();
    assert_eq!(sent.last().map(String::as_str), Some(events::INIT));
}

#[tokio::test]
async fn test_module_history_over_bridge() {
    let (outgoing, _panel) = ChannelBridge::channel();
    let context = BackendContext::batched(BackendSettings::default(), outgoing);
    let controller = context.attach(todo_store()).unwrap();
    {
        let mut controller = controller.lock();
        controller
            .register_module(
                ModulePath::new(["filters"]),
                ModuleDefinition::new(json!({"done": false})),
                ModuleOptions::default(),
            )
            .unwrap();
        controller.apply_mutation("add", json!("z")).unwrap();
    }

    let (inbound, receiver) = ChannelBridge::channel();
    inbound.emit(events::REVERT, json!(0)).unwrap();
    drop(inbound);

    let dispatcher = Dispatcher::new(&context, controller.clone());
    assert_eq!(dispatcher.run(receiver).await, 1);

    let guard = controller.lock();
    assert!(guard.is_empty());
    assert!(!guard.store().has_module(&ModulePath::new(["filters"])));
    assert_eq!(guard.store().state(), &json!({"todos": ["z"]}));
}


#[tokio::test]
async fn test_failed_inspect_still_reports_through_batch() {
    let (outgoing, mut panel) = ChannelBridge::channel();
    let context = BackendContext::batched(BackendSettings::default(), outgoing);
    let controller = context.attach(strict_counter_store()).unwrap();
    {
        let mut controller = controller.lock();
        controller.apply_mutation("bump", Value::Null).unwrap();
        controller
            .edit_state(-1, &ValuePath::parse("n"), Some(json!("x")))
            .unwrap();
    }
    context.flush().unwrap();
    panel.drain();

    let dispatcher = Dispatcher::new(&context, controller.clone());
    let result = dispatcher.handle(&BridgeMessage::new(events::INSPECT_STATE, json!(0)));
    assert!(matches!(
        result,
        Err(BackendError::History(HistoryError::ReplayFailed { index: 0, .. }))
    ));

    let sent = panel.drain();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].event, events::ERROR);
    assert_eq!(sent[0].payload["index"], json!(0));
}

//! Store adapter boundary
//!
//! The engine never owns the inspected store; it drives it through the
//! [`Store`] trait. [`MemoryStore`] is the in-process implementation used by
//! the backend and the tests.

use std::mem;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{HandlerError, StoreError};
use crate::module::{HandlerFn, ModuleDefinition, ModuleOptions, ModulePath};

pub mod memory;

pub use memory::MemoryStore;

/// How a mutation payload is turned into handler arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CallingConvention {
    /// Array payloads are spread into separate arguments
    Legacy,
    /// The payload is passed as a single argument
    #[default]
    Modern,
}

impl CallingConvention {
    /// Arguments a handler receives for `payload`
    pub fn arguments(self, payload: &Value) -> Vec<Value> {
        match self {
            CallingConvention::Modern => vec![payload.clone()],
            CallingConvention::Legacy => match payload {
                Value::Array(items) => items.clone(),
                Value::Null => Vec::new(),
                other => vec![other.clone()],
            },
        }
    }
}

/// A handler bound to the module whose local state it mutates
#[derive(Clone)]
pub struct MutationHandler {
    /// Owning module; the root module for root handlers
    pub module: ModulePath,
    /// Handler function
    pub handler: HandlerFn,
}

impl MutationHandler {
    /// Bind a handler to a module
    pub fn new(module: ModulePath, handler: HandlerFn) -> Self {
        Self { module, handler }
    }

    /// Run the handler against the module's local state inside `root`
    pub fn apply(&self, root: &mut Value, args: &[Value]) -> Result<(), HandlerError> {
        let local = self
            .module
            .state_path()
            .get_mut(root)
            .ok_or_else(|| HandlerError::StaleState {
                module: self.module.key(),
            })?;
        (self.handler)(local, args)
    }
}

impl std::fmt::Debug for MutationHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationHandler")
            .field("module", &self.module)
            .finish_non_exhaustive()
    }
}

/// Operations the history engine needs from an inspected store
pub trait Store {
    /// Current root state
    fn state(&self) -> &Value;

    /// Mutable access to the root state
    fn state_mut(&mut self) -> &mut Value;

    /// Replace the root state
    fn replace_state(&mut self, state: Value) {
        *self.state_mut() = state;
    }

    /// Install `state` and hand back the one it replaced.
    ///
    /// Replay runs between two swaps, so handlers only ever see the detached
    /// state while the live one is parked by the caller.
    fn swap_state(&mut self, state: Value) -> Value {
        mem::replace(self.state_mut(), state)
    }

    /// Handlers currently registered for a mutation type
    fn mutation_handlers(&self, mutation_type: &str) -> Vec<MutationHandler>;

    /// Convention the store uses to call handlers
    fn calling_convention(&self) -> CallingConvention {
        CallingConvention::Modern
    }

    /// All getters evaluated against the current state, as an object
    fn getters(&self) -> Value;

    /// Attach a module at `path`
    fn register_module(
        &mut self,
        path: &ModulePath,
        module: ModuleDefinition,
        options: ModuleOptions,
    ) -> Result<(), StoreError>;

    /// Detach the module at `path` and drop its state
    fn unregister_module(&mut self, path: &ModulePath) -> Result<(), StoreError>;

    /// Whether a dynamic module is attached at `path`
    fn has_module(&self, path: &ModulePath) -> bool;

    /// Run every handler registered for `mutation_type`
    fn commit(&mut self, mutation_type: &str, payload: &Value) -> Result<(), StoreError> {
        let handlers = self.mutation_handlers(mutation_type);
        if handlers.is_empty() {
            return Err(StoreError::UnknownMutation(mutation_type.to_string()));
        }
        let args = self.calling_convention().arguments(payload);
        for handler in &handlers {
            handler.apply(self.state_mut(), &args)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_modern_passes_payload_whole() {
        let args = CallingConvention::Modern.arguments(&json!([1, 2]));
        assert_eq!(args, vec![json!([1, 2])]);
    }

    #[test]
    fn test_legacy_spreads_arrays() {
        assert_eq!(
            CallingConvention::Legacy.arguments(&json!([1, 2])),
            vec![json!(1), json!(2)]
        );
        assert!(CallingConvention::Legacy.arguments(&Value::Null).is_empty());
        assert_eq!(
            CallingConvention::Legacy.arguments(&json!({"a": 1})),
            vec![json!({"a": 1})]
        );
    }

    #[test]
    fn test_handler_applies_to_local_state() {
        let handler = MutationHandler::new(
            ModulePath::new(["counter"]),
            Arc::new(|state: &mut Value, _: &[Value]| -> Result<(), HandlerError> {
                state["n"] = json!(1);
                Ok(())
            }),
        );
        let mut root = json!({"counter": {"n": 0}});
        handler.apply(&mut root, &[]).unwrap();
        assert_eq!(root, json!({"counter": {"n": 1}}));
    }

    #[test]
    fn test_handler_on_missing_module_is_stale() {
        let handler = MutationHandler::new(
            ModulePath::new(["gone"]),
            Arc::new(|_: &mut Value, _: &[Value]| -> Result<(), HandlerError> { Ok(()) }),
        );
        let mut root = json!({});
        assert_eq!(
            handler.apply(&mut root, &[]),
            Err(HandlerError::StaleState {
                module: "gone".to_string()
            })
        );
    }
}

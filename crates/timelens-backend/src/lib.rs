//! Page-side backend for timelens
//!
//! Wires a [`HistoryController`](timelens_history::HistoryController) to the
//! panel: settings come from [`SettingsLoader`], the outgoing bridge and
//! settings travel together in a [`BackendContext`], and a [`Dispatcher`]
//! turns incoming panel messages into controller operations.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::json;
//! use timelens_backend::{BackendContext, BackendSettings};
//! use timelens_bridge::NullBridge;
//! use timelens_history::{MemoryStore, ModuleDefinition};
//!
//! let context = BackendContext::new(BackendSettings::default(), Arc::new(NullBridge));
//! let store = MemoryStore::new(ModuleDefinition::new(json!({"count": 0})));
//! let controller = context.attach(store).unwrap();
//! assert!(controller.lock().is_empty());
//! ```

pub mod context;
pub mod dispatcher;
pub mod error;
pub mod settings;

pub use context::{BackendContext, SharedController};
pub use dispatcher::Dispatcher;
pub use error::{BackendError, Result};
pub use settings::{BackendSettings, SettingsLoader, ENV_PREFIX};

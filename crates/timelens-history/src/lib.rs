#![warn(missing_docs)]

//! State history and time-travel engine
//!
//! Records every state-mutating event of an inspected store, keeps periodic
//! full-state checkpoints, and reconstructs the exact state at any point of
//! the recorded timeline by replaying mutations against a checkpoint,
//! including dynamically (un)registered modules.

pub mod config;
pub mod controller;
pub mod error;
pub mod module;
pub mod mutation;
pub mod registry;
pub mod replay;
pub mod snapshot_cache;
pub mod store;

// Re-export public API
pub use config::HistoryConfig;
pub use controller::HistoryController;
pub use error::{HandlerError, HistoryError, Result, StoreError};
pub use module::{ModuleDefinition, ModuleOptions, ModulePath};
pub use mutation::{
    InspectedStateWireRecord, MutationRecord, MutationWireRecord, RecordKind, BASE_INDEX,
};
pub use registry::{ModuleInfo, ModuleRegistry, ReconcilePlan};
pub use replay::{Replayer, StateSnapshot};
pub use snapshot_cache::{SnapshotCache, SnapshotCacheEntry};
pub use store::{CallingConvention, MemoryStore, MutationHandler, Store};

//! Mutation log records and their wire forms

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use timelens_codec::stringify_json;

use crate::module::ModulePath;
use crate::store::{CallingConvention, MutationHandler};

/// Index addressing the base state, before any recorded mutation
pub const BASE_INDEX: i64 = -1;

/// What a log entry did to the store
#[derive(Debug, Clone)]
pub enum RecordKind {
    /// A regular mutation with the handlers captured when it was committed
    Mutation {
        /// Handlers registered for the type at record time
        handlers: Vec<MutationHandler>,
        /// Convention used to build handler arguments
        convention: CallingConvention,
    },
    /// A module was attached
    RegisterModule {
        /// Module path
        path: ModulePath,
    },
    /// A module was detached
    UnregisterModule {
        /// Module path
        path: ModulePath,
    },
}

/// One entry of the mutation log
#[derive(Debug, Clone)]
pub struct MutationRecord {
    /// Mutation type or structural event name
    pub mutation_type: String,
    /// Payload as committed
    pub payload: Value,
    /// Position in the log
    pub index: usize,
    /// What the entry does
    pub kind: RecordKind,
    /// Registered module keys right after this entry
    pub registered_modules: Vec<String>,
    /// When the entry was recorded
    pub timestamp: DateTime<Utc>,
}

impl MutationRecord {
    /// Record a regular mutation
    pub fn mutation(
        mutation_type: impl Into<String>,
        payload: Value,
        handlers: Vec<MutationHandler>,
        convention: CallingConvention,
        registered_modules: Vec<String>,
    ) -> Self {
        Self {
            mutation_type: mutation_type.into(),
            payload,
            index: 0,
            kind: RecordKind::Mutation {
                handlers,
                convention,
            },
            registered_modules,
            timestamp: Utc::now(),
        }
    }

    /// Record a module registration
    pub fn register_module(path: ModulePath, registered_modules: Vec<String>) -> Self {
        Self::structural(
            format!("Register module: {}", path.key()),
            RecordKind::RegisterModule { path },
            registered_modules,
        )
    }

    /// Record a module unregistration
    pub fn unregister_module(path: ModulePath, registered_modules: Vec<String>) -> Self {
        Self::structural(
            format!("Unregister module: {}", path.key()),
            RecordKind::UnregisterModule { path },
            registered_modules,
        )
    }

    fn structural(
        mutation_type: String,
        kind: RecordKind,
        registered_modules: Vec<String>,
    ) -> Self {
        let path = match &kind {
            RecordKind::RegisterModule { path } | RecordKind::UnregisterModule { path } => {
                path.segments().to_vec()
            }
            RecordKind::Mutation { .. } => Vec::new(),
        };
        Self {
            mutation_type,
            payload: json!({ "path": path }),
            index: 0,
            kind,
            registered_modules,
            timestamp: Utc::now(),
        }
    }

    /// Whether the entry changes the module set
    pub fn is_structural(&self) -> bool {
        !matches!(self.kind, RecordKind::Mutation { .. })
    }

    /// Registered modules as a set
    pub fn module_set(&self) -> BTreeSet<String> {
        self.registered_modules.iter().cloned().collect()
    }

    /// Wire form sent to the inspector
    pub fn to_wire(&self) -> MutationWireRecord {
        MutationWireRecord {
            mutation_type: self.mutation_type.clone(),
            payload: stringify_json(&self.payload),
            index: self.index,
            timestamp: self.timestamp.timestamp_millis(),
        }
    }
}

/// Mutation entry as sent over the bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationWireRecord {
    /// Mutation type
    #[serde(rename = "type")]
    pub mutation_type: String,
    /// Encoded payload
    pub payload: String,
    /// Log index
    pub index: usize,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

/// Reconstructed state as sent over the bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectedStateWireRecord {
    /// Inspected index, `-1` for the base state
    pub index: i64,
    /// Encoded `{ state, getters }` snapshot
    pub snapshot: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_payload_carries_path() {
        let record = MutationRecord::register_module(
            ModulePath::new(["shop", "cart"]),
            vec!["shop".into(), "shop/cart".into()],
        );
        assert_eq!(record.mutation_type, "Register module: shop/cart");
        assert_eq!(record.payload, json!({"path": ["shop", "cart"]}));
        assert!(record.is_structural());
        assert_eq!(record.module_set().len(), 2);
    }

    #[test]
    fn test_wire_record_shape() {
        let mut record = MutationRecord::mutation(
            "increment",
            json!(1),
            Vec::new(),
            CallingConvention::Modern,
            Vec::new(),
        );
        record.index = 3;
        let wire = serde_json::to_value(record.to_wire()).unwrap();
        assert_eq!(wire["type"], json!("increment"));
        assert_eq!(wire["payload"], json!("1"));
        assert_eq!(wire["index"], json!(3));
        assert!(wire["timestamp"].is_i64());
    }
}

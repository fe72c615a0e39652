//! Store module definitions and paths

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use timelens_common::ValuePath;

use crate::error::HandlerError;

/// A mutation handler: receives the module's local state and the call arguments
pub type HandlerFn = Arc<dyn Fn(&mut Value, &[Value]) -> Result<(), HandlerError> + Send + Sync>;

/// A getter: receives the module's local state and the root state
pub type GetterFn = Arc<dyn Fn(&Value, &Value) -> Value + Send + Sync>;

/// Hierarchical module path, e.g. `["account", "profile"]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ModulePath(Vec<String>);

impl ModulePath {
    /// Build a path from its segments
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// The root module path
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Parse a joined key such as `account/profile`
    pub fn from_key(key: &str) -> Self {
        Self::new(key.split('/').filter(|s| !s.is_empty()))
    }

    /// Joined key used to index registries
    pub fn key(&self) -> String {
        self.0.join("/")
    }

    /// Path segments
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Number of segments
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Whether this is the root module
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Enclosing module path, `None` for the root
    pub fn parent(&self) -> Option<ModulePath> {
        self.0
            .split_last()
            .map(|(_, parent)| ModulePath(parent.to_vec()))
    }

    /// Path of a direct child module
    pub fn child(&self, name: &str) -> ModulePath {
        let mut segments = self.0.clone();
        segments.push(name.to_string());
        ModulePath(segments)
    }

    /// Where this module's state lives in the root state tree
    pub fn state_path(&self) -> ValuePath {
        ValuePath::from_segments(&self.0)
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl From<&str> for ModulePath {
    fn from(key: &str) -> Self {
        ModulePath::from_key(key)
    }
}

/// Depth of a joined module key
pub(crate) fn key_depth(key: &str) -> usize {
    key.split('/').filter(|s| !s.is_empty()).count()
}

/// Options passed along with a module registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ModuleOptions {
    /// Keep the state already present at the module path
    pub preserve_state: bool,
}

impl ModuleOptions {
    /// Options that keep existing state
    pub fn preserving() -> Self {
        Self {
            preserve_state: true,
        }
    }
}

/// A module sub-tree: initial state, handlers, getters and child modules
#[derive(Clone, Default)]
pub struct ModuleDefinition {
    /// Initial state of this module
    pub state: Value,
    /// Mutation handlers by name
    pub mutations: BTreeMap<String, HandlerFn>,
    /// Getters by name
    pub getters: BTreeMap<String, GetterFn>,
    /// Child modules by name
    pub modules: BTreeMap<String, ModuleDefinition>,
    /// Whether handler and getter names are prefixed with the module path
    pub namespaced: bool,
}

impl ModuleDefinition {
    /// A module with the given initial state
    pub fn new(state: Value) -> Self {
        Self {
            state,
            ..Self::default()
        }
    }

    /// Add a mutation handler
    pub fn with_mutation<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Value, &[Value]) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.mutations.insert(name.into(), Arc::new(handler));
        self
    }

    /// Add a getter
    pub fn with_getter<F>(mut self, name: impl Into<String>, getter: F) -> Self
    where
        F: Fn(&Value, &Value) -> Value + Send + Sync + 'static,
    {
        self.getters.insert(name.into(), Arc::new(getter));
        self
    }

    /// Add a child module
    pub fn with_module(mut self, name: impl Into<String>, module: ModuleDefinition) -> Self {
        self.modules.insert(name.into(), module);
        self
    }

    /// Set the namespaced flag
    pub fn namespaced(mut self, namespaced: bool) -> Self {
        self.namespaced = namespaced;
        self
    }

    /// Same definition with a different initial state
    pub fn with_state(&self, state: Value) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }

    /// Initial state with every child module's state nested under its name.
    ///
    /// A key already present in the state wins over a child of the same name,
    /// so a previously captured full state can be fed back in unchanged.
    pub fn collect_state(&self) -> Value {
        if self.modules.is_empty() {
            return self.state.clone();
        }
        let mut state = match &self.state {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            other => return other.clone(),
        };
        for (name, child) in &self.modules {
            if !state.contains_key(name) {
                state.insert(name.clone(), child.collect_state());
            }
        }
        Value::Object(state)
    }
}

impl fmt::Debug for ModuleDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDefinition")
            .field("state", &self.state)
            .field("mutations", &self.mutations.keys().collect::<Vec<_>>())
            .field("getters", &self.getters.keys().collect::<Vec<_>>())
            .field("modules", &self.modules)
            .field("namespaced", &self.namespaced)
            .finish()
    }
}

//! In-process store backed by a `serde_json::Value` state tree

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;

use super::{CallingConvention, MutationHandler, Store};
use crate::error::StoreError;
use crate::module::{ModuleDefinition, ModuleOptions, ModulePath};

/// A store whose modules are plain [`ModuleDefinition`] trees.
///
/// Mutation and getter names of a namespaced module are prefixed with its
/// namespace, e.g. `cart/add` for a namespaced module at `cart`.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    state: Value,
    root: ModuleDefinition,
    dynamic: BTreeMap<String, (ModulePath, ModuleDefinition)>,
    convention: CallingConvention,
}

impl MemoryStore {
    /// Create a store from its root module
    pub fn new(root: ModuleDefinition) -> Self {
        Self {
            state: root.collect_state(),
            root,
            dynamic: BTreeMap::new(),
            convention: CallingConvention::default(),
        }
    }

    /// Use a different calling convention
    pub fn with_convention(mut self, convention: CallingConvention) -> Self {
        self.convention = convention;
        self
    }

    /// Keys of the dynamically registered modules
    pub fn registered_modules(&self) -> Vec<String> {
        self.dynamic.keys().cloned().collect()
    }

    fn namespace_of(path: &ModulePath, module: &ModuleDefinition) -> String {
        if module.namespaced {
            format!("{}/", path.key())
        } else {
            String::new()
        }
    }

    /// Visit every module of the store with its path and namespace
    fn walk<'a, F>(&'a self, mut visit: F)
    where
        F: FnMut(&ModulePath, &str, &'a ModuleDefinition),
    {
        fn descend<'a, F>(
            module: &'a ModuleDefinition,
            path: &ModulePath,
            namespace: &str,
            visit: &mut F,
        ) where
            F: FnMut(&ModulePath, &str, &'a ModuleDefinition),
        {
            visit(path, namespace, module);
            for (name, child) in &module.modules {
                let child_namespace = if child.namespaced {
                    format!("{}{}/", namespace, name)
                } else {
                    namespace.to_string()
                };
                descend(child, &path.child(name), &child_namespace, visit);
            }
        }

        descend(&self.root, &ModulePath::root(), "", &mut visit);
        for (path, module) in self.dynamic.values() {
            let namespace = Self::namespace_of(path, module);
            descend(module, path, &namespace, &mut visit);
        }
    }
}

impl Store for MemoryStore {
    fn state(&self) -> &Value {
        &self.state
    }

    fn state_mut(&mut self) -> &mut Value {
        &mut self.state
    }

    fn mutation_handlers(&self, mutation_type: &str) -> Vec<MutationHandler> {
        let mut handlers = Vec::new();
        self.walk(|path, namespace, module| {
            for (name, handler) in &module.mutations {
                if format!("{}{}", namespace, name) == mutation_type {
                    handlers.push(MutationHandler::new(path.clone(), handler.clone()));
                }
            }
        });
        handlers
    }

    fn calling_convention(&self) -> CallingConvention {
        self.convention
    }

    fn getters(&self) -> Value {
        let mut getters = Map::new();
        self.walk(|path, namespace, module| {
            if module.getters.is_empty() {
                return;
            }
            let local = path
                .state_path()
                .get(&self.state)
                .cloned()
                .unwrap_or(Value::Null);
            for (name, getter) in &module.getters {
                getters.insert(format!("{}{}", namespace, name), getter(&local, &self.state));
            }
        });
        Value::Object(getters)
    }

    fn register_module(
        &mut self,
        path: &ModulePath,
        module: ModuleDefinition,
        options: ModuleOptions,
    ) -> Result<(), StoreError> {
        let key = path.key();
        let Some(parent) = path.parent() else {
            return Err(StoreError::InvalidModulePath(key));
        };
        if self.dynamic.contains_key(&key) {
            return Err(StoreError::AlreadyRegistered(key));
        }
        if !matches!(parent.state_path().get(&self.state), Some(Value::Object(_))) {
            return Err(StoreError::ParentMissing {
                module: key,
                parent: parent.key(),
            });
        }

        if !options.preserve_state {
            path.state_path().set(&mut self.state, module.collect_state())?;
        }
        debug!(module = %key, preserve_state = options.preserve_state, "Registered module");
        self.dynamic.insert(key, (path.clone(), module));
        Ok(())
    }

    fn unregister_module(&mut self, path: &ModulePath) -> Result<(), StoreError> {
        let key = path.key();
        if !self.dynamic.contains_key(&key) {
            return Err(StoreError::NotRegistered(key));
        }
        let prefix = format!("{}/", key);
        let children: Vec<String> = self
            .dynamic
            .keys()
            .filter(|other| other.starts_with(&prefix))
            .cloned()
            .collect();
        if !children.is_empty() {
            return Err(StoreError::HasChildren {
                module: key,
                children,
            });
        }

        self.dynamic.remove(&key);
        path.state_path().remove(&mut self.state);
        debug!(module = %key, "Unregistered module");
        Ok(())
    }

    fn has_module(&self, path: &ModulePath) -> bool {
        self.dynamic.contains_key(&path.key())
    }
}

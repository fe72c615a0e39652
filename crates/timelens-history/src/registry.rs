//! Dynamic module bookkeeping
//!
//! Tracks which modules are registered right now and keeps, for every module
//! ever registered, what is needed to register it again when travelling back
//! to a point where it existed.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::module::{key_depth, ModuleDefinition, ModuleOptions, ModulePath};
use crate::mutation::MutationRecord;
use crate::store::Store;

/// Everything needed to register a module again
#[derive(Debug, Clone)]
pub struct ModuleInfo {
    /// Module path
    pub path: ModulePath,
    /// Definition as registered
    pub module: ModuleDefinition,
    /// Options used when re-registering
    pub options: ModuleOptions,
    /// State captured at registration, child modules included
    pub state: Value,
}

impl ModuleInfo {
    /// Capture a module about to be registered on a store whose state is `current`
    pub fn capture(
        current: &Value,
        path: ModulePath,
        module: ModuleDefinition,
        options: ModuleOptions,
    ) -> Self {
        let state = if options.preserve_state {
            path.state_path()
                .get(current)
                .cloned()
                .unwrap_or_else(|| module.collect_state())
        } else {
            module.collect_state()
        };
        Self {
            path,
            module,
            options: ModuleOptions::default(),
            state,
        }
    }

    /// Definition carrying the captured state
    pub fn definition(&self) -> ModuleDefinition {
        self.module.with_state(self.state.clone())
    }

    /// Register this module on `store`
    pub fn register_on<S: Store + ?Sized>(
        &self,
        store: &mut S,
        options: ModuleOptions,
    ) -> Result<(), StoreError> {
        store.register_module(&self.path, self.definition(), options)
    }
}

/// Modules to attach and detach to move from one module set to another
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReconcilePlan {
    /// Keys to register, parents first
    pub register: Vec<String>,
    /// Keys to unregister, children first
    pub unregister: Vec<String>,
}

impl ReconcilePlan {
    /// Plan the move from `current` to `target`
    pub fn between(current: &BTreeSet<String>, target: &BTreeSet<String>) -> Self {
        let mut register: Vec<String> = target.difference(current).cloned().collect();
        register.sort_by(|a, b| key_depth(a).cmp(&key_depth(b)).then_with(|| a.cmp(b)));

        let mut unregister: Vec<String> = current.difference(target).cloned().collect();
        unregister.sort_by(|a, b| key_depth(b).cmp(&key_depth(a)).then_with(|| a.cmp(b)));

        Self {
            register,
            unregister,
        }
    }

    /// Nothing to do
    pub fn is_empty(&self) -> bool {
        self.register.is_empty() && self.unregister.is_empty()
    }
}

/// Registry of dynamic modules
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    registered: BTreeSet<String>,
    all_time: BTreeMap<String, ModuleInfo>,
}

impl ModuleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a module as registered and remember how to restore it
    pub fn add_module(&mut self, info: ModuleInfo) {
        let key = info.path.key();
        self.registered.insert(key.clone());
        self.all_time.insert(key, info);
    }

    /// Mark a module as unregistered; its info is kept
    pub fn remove_module(&mut self, path: &ModulePath) -> bool {
        self.registered.remove(&path.key())
    }

    /// Whether the module is currently registered
    pub fn is_registered(&self, key: &str) -> bool {
        self.registered.contains(key)
    }

    /// Currently registered keys, sorted
    pub fn registered(&self) -> Vec<String> {
        self.registered.iter().cloned().collect()
    }

    /// Currently registered keys as a set
    pub fn registered_set(&self) -> &BTreeSet<String> {
        &self.registered
    }

    /// Info for any module ever registered
    pub fn info(&self, key: &str) -> Option<&ModuleInfo> {
        self.all_time.get(key)
    }

    /// Bring the live store to the module set right after `record`; `None`
    /// removes every dynamic module
    pub fn reconcile_to<S: Store + ?Sized>(
        &mut self,
        store: &mut S,
        record: Option<&MutationRecord>,
    ) -> Result<(), StoreError> {
        let target = record.map(MutationRecord::module_set).unwrap_or_default();
        self.reconcile_to_set(store, &target)
    }

    /// Bring the live store to exactly `target`.
    ///
    /// Registrations run before unregistrations. Modules without recorded
    /// info are skipped.
    pub fn reconcile_to_set<S: Store + ?Sized>(
        &mut self,
        store: &mut S,
        target: &BTreeSet<String>,
    ) -> Result<(), StoreError> {
        let plan = ReconcilePlan::between(&self.registered, target);
        if plan.is_empty() {
            return Ok(());
        }
        debug!(
            register = ?plan.register,
            unregister = ?plan.unregister,
            "Reconciling modules"
        );

        for key in &plan.register {
            let Some(info) = self.all_time.get(key) else {
                warn!(module = %key, "No registration info for module, skipping");
                continue;
            };
            if !store.has_module(&info.path) {
                info.register_on(store, ModuleOptions::default())?;
            }
            self.registered.insert(key.clone());
        }

        for key in &plan.unregister {
            let path = ModulePath::from_key(key);
            if store.has_module(&path) {
                store.unregister_module(&path)?;
            }
            self.registered.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn set(keys: &[&str]) -> BTreeSet<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    fn store_with(registry: &mut ModuleRegistry, keys: &[&str]) -> MemoryStore {
        let mut store = MemoryStore::new(ModuleDefinition::new(json!({})));
        for key in keys {
            let path = ModulePath::from_key(key);
            let info = ModuleInfo::capture(
                store.state(),
                path.clone(),
                ModuleDefinition::new(json!({"name": key})),
                ModuleOptions::default(),
            );
            info.register_on(&mut store, ModuleOptions::default()).unwrap();
            registry.add_module(info);
        }
        store
    }

    #[test]
    fn test_plan_orders_by_depth() {
        let plan = ReconcilePlan::between(&set(&["x", "x/y", "x/y/z"]), &set(&["a/b", "a"]));
        assert_eq!(plan.register, vec!["a", "a/b"]);
        assert_eq!(plan.unregister, vec!["x/y/z", "x/y", "x"]);
    }

    #[test]
    fn test_capture_preserving_reads_existing_state() {
        let info = ModuleInfo::capture(
            &json!({"cart": {"items": [1]}}),
            ModulePath::new(["cart"]),
            ModuleDefinition::new(json!({"items": []})),
            ModuleOptions::preserving(),
        );
        assert_eq!(info.state, json!({"items": [1]}));
        assert!(!info.options.preserve_state);
    }

    #[test]
    fn test_reconcile_registers_and_unregisters() {
        let mut registry = ModuleRegistry::new();
        let mut store = store_with(&mut registry, &["a", "a/b", "c"]);

        registry.reconcile_to_set(&mut store, &set(&["c"])).unwrap();
        assert_eq!(registry.registered(), vec!["c"]);
        assert_eq!(store.registered_modules(), vec!["c"]);
        assert_eq!(store.state(), &json!({"c": {"name": "c"}}));

        registry
            .reconcile_to_set(&mut store, &set(&["a", "a/b"]))
            .unwrap();
        assert_eq!(store.registered_modules(), vec!["a", "a/b"]);
        assert_eq!(
            store.state(),
            &json!({"a": {"name": "a", "b": {"name": "a/b"}}})
        );
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut registry = ModuleRegistry::new();
        let mut store = store_with(&mut registry, &["a", "b"]);
        let target = set(&["a"]);

        registry.reconcile_to_set(&mut store, &target).unwrap();
        let state = store.state().clone();
        registry.reconcile_to_set(&mut store, &target).unwrap();

        assert_eq!(store.state(), &state);
        assert_eq!(registry.registered(), vec!["a"]);
    }

    #[test]
    fn test_reconcile_to_none_removes_all() {
        let mut registry = ModuleRegistry::new();
        let mut store = store_with(&mut registry, &["a", "a/b"]);
        registry.reconcile_to(&mut store, None).unwrap();
        assert!(registry.registered().is_empty());
        assert!(store.registered_modules().is_empty());
        assert!(registry.info("a/b").is_some());
    }

    #[test]
    fn test_unknown_module_skipped() {
        let mut registry = ModuleRegistry::new();
        let mut store = MemoryStore::new(ModuleDefinition::new(json!({})));
        registry
            .reconcile_to_set(&mut store, &set(&["ghost"]))
            .unwrap();
        assert!(registry.registered().is_empty());
    }
}

//! State reconstruction
//!
//! A [`Replayer`] rebuilds the state at a log index from the nearest cached
//! snapshot. The live state is parked for the whole run and handlers only
//! ever touch the detached copy; the live state and module set are put back
//! whether or not the replay succeeds.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use timelens_codec::stringify_json;
use tracing::{debug, trace, warn};

use crate::error::{HandlerError, HistoryError, Result, StoreError};
use crate::module::{ModuleOptions, ModulePath};
use crate::mutation::{MutationRecord, RecordKind, BASE_INDEX};
use crate::registry::{ModuleRegistry, ReconcilePlan};
use crate::snapshot_cache::SnapshotCache;
use crate::store::Store;

/// State and getters at a point in history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Root state
    pub state: Value,
    /// Getter values computed against `state`
    pub getters: Value,
}

impl StateSnapshot {
    /// Capture the store's current state and getters
    pub fn capture<S: Store + ?Sized>(store: &S) -> Self {
        Self {
            state: store.state().clone(),
            getters: store.getters(),
        }
    }

    /// Encoded form sent to the inspector
    pub fn to_wire_string(&self) -> String {
        stringify_json(&json!({
            "state": self.state,
            "getters": self.getters,
        }))
    }
}

/// Module set registered right after `index`
pub(crate) fn modules_at(
    log: &[MutationRecord],
    base_modules: &BTreeSet<String>,
    index: i64,
) -> BTreeSet<String> {
    usize::try_from(index)
        .ok()
        .and_then(|i| log.get(i))
        .map(MutationRecord::module_set)
        .unwrap_or_else(|| base_modules.clone())
}

/// One reconstruction run
pub struct Replayer<'a, S: Store + ?Sized> {
    store: &'a mut S,
    registry: &'a ModuleRegistry,
    log: &'a [MutationRecord],
    cache: &'a mut SnapshotCache,
    cache_every: usize,
    base_modules: &'a BTreeSet<String>,
    present: BTreeSet<String>,
}

impl<'a, S: Store + ?Sized> Replayer<'a, S> {
    /// Prepare a replay over `log`, checkpointing every `cache_every` entries
    pub fn new(
        store: &'a mut S,
        registry: &'a ModuleRegistry,
        log: &'a [MutationRecord],
        cache: &'a mut SnapshotCache,
        cache_every: usize,
        base_modules: &'a BTreeSet<String>,
    ) -> Self {
        Self {
            store,
            registry,
            log,
            cache,
            cache_every: cache_every.max(1),
            base_modules,
            present: registry.registered_set().clone(),
        }
    }

    /// Reconstruct the state at `index` (`-1` for the base state)
    pub fn replay(mut self, index: i64) -> Result<StateSnapshot> {
        let last = self.log.len() as i64 - 1;
        if !(BASE_INDEX..=last).contains(&index) {
            return Err(HistoryError::validation(format!(
                "index {} outside history range {}..={}",
                index, BASE_INDEX, last
            )));
        }

        let entry = self.cache.get(index);
        let start = entry.index;
        let state = entry.state.clone();
        debug!(index, from = start, "Replaying state");

        let live = self.store.swap_state(state.clone());
        let result = self.reconstruct(index, start, state);
        let restored = self.restore(live);

        match (result, restored) {
            (Ok(snapshot), Ok(())) => Ok(snapshot),
            (Ok(_), Err(e)) => Err(HistoryError::Store(e)),
            (Err(e), restored) => {
                if let Err(restore_error) = restored {
                    warn!(error = %restore_error, "Failed to restore live modules after replay");
                }
                Err(e)
            }
        }
    }

    fn reconstruct(&mut self, index: i64, start: i64, state: Value) -> Result<StateSnapshot> {
        // entries hold exactly the state at `start`; detaching live modules
        // must not strip keys from it
        let start_modules = modules_at(self.log, self.base_modules, start);
        self.align(&start_modules)
            .map_err(|e| HistoryError::replay_failed(start, e))?;
        self.store.replace_state(state);

        for i in (start + 1)..=index {
            self.apply(i)?;
            if i != index && i as usize % self.cache_every == 0 {
                self.cache.put(i, self.store.state().clone());
            }
        }
        if index > start {
            self.cache.put(index, self.store.state().clone());
        }

        let target_modules = modules_at(self.log, self.base_modules, index);
        if !ReconcilePlan::between(&self.present, &target_modules).is_empty() {
            let replayed = self.store.state().clone();
            self.align(&target_modules)
                .map_err(|e| HistoryError::replay_failed(index, e))?;
            self.store.replace_state(replayed);
        }
        Ok(StateSnapshot::capture(&*self.store))
    }

    fn apply(&mut self, index: i64) -> Result<()> {
        let Some(record) = usize::try_from(index).ok().and_then(|i| self.log.get(i)) else {
            return Ok(());
        };
        trace!(index, mutation = %record.mutation_type, "Applying record");

        match &record.kind {
            RecordKind::Mutation {
                handlers,
                convention,
            } => {
                if handlers.is_empty() {
                    warn!(index, mutation = %record.mutation_type, "No handlers recorded, skipping");
                    return Ok(());
                }
                let args = convention.arguments(&record.payload);
                for handler in handlers {
                    match handler.apply(self.store.state_mut(), &args) {
                        Ok(()) => {}
                        Err(HandlerError::StaleState { module }) => {
                            warn!(index, module = %module, "Module state gone, skipping handler");
                        }
                        Err(e) => return Err(HistoryError::replay_failed(index, e)),
                    }
                }
            }
            RecordKind::RegisterModule { path } => {
                let key = path.key();
                let registry = self.registry;
                match registry.info(&key) {
                    Some(info) => {
                        if !self.store.has_module(path) {
                            info.register_on(self.store, ModuleOptions::default())
                                .map_err(|e| HistoryError::replay_failed(index, e))?;
                        }
                        self.present.insert(key);
                    }
                    None => warn!(index, module = %key, "No registration info for module"),
                }
            }
            RecordKind::UnregisterModule { path } => {
                if self.store.has_module(path) {
                    self.store
                        .unregister_module(path)
                        .map_err(|e| HistoryError::replay_failed(index, e))?;
                }
                self.present.remove(&path.key());
            }
        }
        Ok(())
    }

    /// Attach and detach modules so the store matches `target`, keeping
    /// whatever state is already in place for attached modules
    fn align(&mut self, target: &BTreeSet<String>) -> std::result::Result<(), StoreError> {
        let registry = self.registry;
        let plan = ReconcilePlan::between(&self.present, target);
        for key in &plan.register {
            let Some(info) = registry.info(key) else {
                warn!(module = %key, "No registration info for module, skipping");
                continue;
            };
            if !self.store.has_module(&info.path) {
                info.register_on(self.store, ModuleOptions::preserving())?;
            }
            self.present.insert(key.clone());
        }
        for key in &plan.unregister {
            let path = ModulePath::from_key(key);
            if self.store.has_module(&path) {
                self.store.unregister_module(&path)?;
            }
            self.present.remove(key);
        }
        Ok(())
    }

    /// Put the live state back and return to the live module set
    fn restore(&mut self, live: Value) -> std::result::Result<(), StoreError> {
        let registry = self.registry;
        let original = registry.registered_set();
        let plan = ReconcilePlan::between(&self.present, original);
        let mut first_error = None;

        // temporaries are detached while the replayed state is still installed
        for key in &plan.unregister {
            let path = ModulePath::from_key(key);
            if self.store.has_module(&path) {
                if let Err(e) = self.store.unregister_module(&path) {
                    first_error.get_or_insert(e);
                }
            }
        }

        self.store.replace_state(live);

        for key in &plan.register {
            if let Some(info) = registry.info(key) {
                if !self.store.has_module(&info.path) {
                    if let Err(e) = info.register_on(self.store, ModuleOptions::preserving()) {
                        first_error.get_or_insert(e);
                    }
                }
            }
        }
        self.present = original.clone();

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

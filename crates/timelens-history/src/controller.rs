//! History controller
//!
//! Owns the mutation log, the snapshot cache and the module registry for one
//! inspected store and exposes the time-travel operations the panel drives.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::{json, Value};
use timelens_bridge::{events, Bridge};
use timelens_codec::parse;
use timelens_common::{Validatable, ValuePath};
use tracing::{debug, error, info, warn};

use crate::config::HistoryConfig;
use crate::error::{HistoryError, Result};
use crate::module::{ModuleDefinition, ModuleOptions, ModulePath};
use crate::mutation::{InspectedStateWireRecord, MutationRecord, BASE_INDEX};
use crate::registry::{ModuleInfo, ModuleRegistry};
use crate::replay::{modules_at, Replayer, StateSnapshot};
use crate::snapshot_cache::SnapshotCache;
use crate::store::Store;

/// Records a store's mutations and travels through them
pub struct HistoryController<S: Store> {
    store: S,
    registry: ModuleRegistry,
    log: Vec<MutationRecord>,
    cache: SnapshotCache,
    config: HistoryConfig,
    base_modules: BTreeSet<String>,
    last_state: Option<(i64, Value)>,
    bridge: Arc<dyn Bridge>,
}

impl<S: Store> HistoryController<S> {
    /// Attach to `store`; its current state becomes the base state
    pub fn new(store: S, config: HistoryConfig, bridge: Arc<dyn Bridge>) -> Result<Self> {
        config.validate()?;
        let cache = SnapshotCache::new(store.state().clone(), config.cache_limit);
        let controller = Self {
            store,
            registry: ModuleRegistry::new(),
            log: Vec::new(),
            cache,
            config,
            base_modules: BTreeSet::new(),
            last_state: None,
            bridge,
        };
        controller.send_init();
        Ok(controller)
    }

    /// Recorded entries in log order
    pub fn history(&self) -> &[MutationRecord] {
        &self.log
    }

    /// Number of recorded entries
    pub fn len(&self) -> usize {
        self.log.len()
    }

    /// Whether nothing has been recorded since the base state
    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// The inspected store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable access to the inspected store, bypassing recording
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Dynamic module bookkeeping
    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Snapshot cache
    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    /// Active configuration
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Last reconstructed state and the index it belongs to
    pub fn last_state(&self) -> Option<(i64, &Value)> {
        self.last_state.as_ref().map(|(index, state)| (*index, state))
    }

    /// Whether mutations are being recorded
    pub fn is_recording(&self) -> bool {
        self.config.recording
    }

    /// Pause or resume recording
    pub fn set_recording(&mut self, recording: bool) {
        info!(recording, "Recording toggled");
        self.config.recording = recording;
    }

    /// Swap in new settings; the cache shrinks right away if needed
    pub fn set_config(&mut self, config: HistoryConfig) -> Result<()> {
        config.validate()?;
        self.cache.set_limit(config.cache_limit);
        self.config = config;
        Ok(())
    }

    /// State and getters of the live store
    pub fn store_snapshot(&self) -> StateSnapshot {
        StateSnapshot::capture(&self.store)
    }

    /// Append a mutation the store has just committed.
    ///
    /// Returns the new entry's index, or `None` while recording is paused.
    pub fn record(&mut self, mutation_type: &str, payload: Value) -> Option<usize> {
        if !self.config.recording {
            return None;
        }
        let record = MutationRecord::mutation(
            mutation_type,
            payload,
            self.store.mutation_handlers(mutation_type),
            self.store.calling_convention(),
            self.registry.registered(),
        );
        Some(self.push(record))
    }

    /// Commit a mutation on the live store and record it
    pub fn apply_mutation(&mut self, mutation_type: &str, payload: Value) -> Result<Option<usize>> {
        self.store.commit(mutation_type, &payload)?;
        Ok(self.record(mutation_type, payload))
    }

    /// Register a module on the live store and remember how to restore it
    pub fn register_module(
        &mut self,
        path: ModulePath,
        module: ModuleDefinition,
        options: ModuleOptions,
    ) -> Result<()> {
        let info = ModuleInfo::capture(self.store.state(), path.clone(), module.clone(), options);
        self.store.register_module(&path, module, options)?;
        self.registry.add_module(info);
        info!(module = %path, "Module registered");

        if self.config.recording {
            let record = MutationRecord::register_module(path, self.registry.registered());
            self.push(record);
        }
        self.send_init();
        Ok(())
    }

    /// Unregister a module from the live store
    pub fn unregister_module(&mut self, path: ModulePath) -> Result<()> {
        self.store.unregister_module(&path)?;
        self.registry.remove_module(&path);
        info!(module = %path, "Module unregistered");

        if self.config.recording {
            let record = MutationRecord::unregister_module(path, self.registry.registered());
            self.push(record);
        }
        self.send_init();
        Ok(())
    }

    /// Reconstruct the state at `index` without touching the live store.
    ///
    /// The index is clamped to the recorded range; `-1` is the base state.
    pub fn inspect(&mut self, index: i64) -> Result<StateSnapshot> {
        let index = self.clamp(index);
        match self.replay(index) {
            Ok(snapshot) => {
                self.last_state = Some((index, snapshot.state.clone()));
                let record = InspectedStateWireRecord {
                    index,
                    snapshot: snapshot.to_wire_string(),
                };
                self.emit(
                    events::INSPECTED_STATE,
                    json!({ "index": record.index, "snapshot": record.snapshot }),
                );
                Ok(snapshot)
            }
            Err(e) => {
                error!(index, error = %e, "State reconstruction failed");
                self.emit(
                    events::ERROR,
                    json!({ "index": index, "message": e.to_string() }),
                );
                Err(e)
            }
        }
    }

    /// Inspect `index` and, with `apply`, push the result into the live store
    pub fn travel_to(&mut self, index: i64, apply: bool) -> Result<InspectedStateWireRecord> {
        let index = self.clamp(index);
        let snapshot = self.inspect(index)?;
        if apply {
            let target = modules_at(&self.log, &self.base_modules, index);
            self.registry.reconcile_to_set(&mut self.store, &target)?;
            self.store.replace_state(snapshot.state.clone());
            debug!(index, "Travelled live store");
        }
        Ok(InspectedStateWireRecord {
            index,
            snapshot: snapshot.to_wire_string(),
        })
    }

    /// Collapse the whole history into the current live state
    pub fn commit_all(&mut self) {
        info!(entries = self.log.len(), "Committing all mutations");
        self.log.clear();
        self.cache.reset(self.store.state().clone());
        self.base_modules = self.registry.registered_set().clone();
        self.last_state = None;
    }

    /// Drop the whole history; the live store is left as is
    pub fn revert_all(&mut self) {
        info!(entries = self.log.len(), "Reverting all mutations");
        self.log.clear();
        self.cache.invalidate_after(BASE_INDEX);
        self.last_state = None;
    }

    /// Make the state at `index` the new base and drop every entry up to it.
    ///
    /// The last inspected state is reused when it belongs to `index`;
    /// otherwise the state is reconstructed first.
    pub fn commit(&mut self, index: i64) -> Result<()> {
        let index = self.clamp(index);
        if index == BASE_INDEX {
            return Ok(());
        }
        let base = match self.last_state.take() {
            Some((at, state)) if at == index => state,
            _ => self.replay(index)?.state,
        };
        let base_modules = modules_at(&self.log, &self.base_modules, index);

        let keep = self.log.split_off(index as usize + 1);
        self.log = keep;
        self.renumber();
        self.cache.rebase(index, base);
        self.base_modules = base_modules;
        info!(index, remaining = self.log.len(), "Committed history");
        Ok(())
    }

    /// Drop every entry from `index` on, detaching modules registered since
    pub fn revert(&mut self, index: i64) -> Result<()> {
        let Ok(index) = usize::try_from(index) else {
            return Err(HistoryError::validation(format!(
                "cannot revert to index {}",
                index
            )));
        };
        if index >= self.log.len() {
            return Ok(());
        }
        let previous = index as i64 - 1;
        let target = modules_at(&self.log, &self.base_modules, previous);
        self.registry.reconcile_to_set(&mut self.store, &target)?;

        self.log.truncate(index);
        self.cache.invalidate_after(previous);
        if matches!(self.last_state, Some((at, _)) if at > previous) {
            self.last_state = None;
        }
        info!(index, "Reverted history");
        Ok(())
    }

    /// Replace base and live state with an encoded state and clear history.
    ///
    /// Nothing changes if the text cannot be decoded.
    pub fn import_state(&mut self, text: &str) -> Result<()> {
        let state = match parse(text, true).and_then(|value| value.into_state()) {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "Rejected state import");
                return Err(e.into());
            }
        };

        self.store.replace_state(state.clone());
        self.cache.reset(state);
        self.log.clear();
        self.base_modules = self.registry.registered_set().clone();
        self.last_state = None;
        info!("Imported state");
        self.send_init();
        Ok(())
    }

    /// Edit the live state at `path` and pin the same edit as the snapshot
    /// at `index`. `None` removes the value.
    ///
    /// The pinned snapshot is the reconstructed state at `index` with the
    /// edit applied, so it only holds state of modules registered there.
    /// Snapshots after `index` are dropped; replays past it start from the
    /// edited state.
    pub fn edit_state(&mut self, index: i64, path: &ValuePath, value: Option<Value>) -> Result<()> {
        let index = self.clamp(index);
        let mut pinned = self.replay(index)?.state;
        write_path(&mut pinned, path, value.clone())?;
        write_path(self.store.state_mut(), path, value)?;

        if index == BASE_INDEX {
            self.cache.reset(pinned);
        } else {
            self.cache.invalidate_after(index);
            self.cache.pin(index, pinned);
        }
        if matches!(self.last_state, Some((at, _)) if at >= index) {
            self.last_state = None;
        }
        debug!(index, path = %path, "Edited state");
        Ok(())
    }

    fn replay(&mut self, index: i64) -> Result<StateSnapshot> {
        Replayer::new(
            &mut self.store,
            &self.registry,
            &self.log,
            &mut self.cache,
            self.config.cache_every,
            &self.base_modules,
        )
        .replay(index)
    }

    fn push(&mut self, mut record: MutationRecord) -> usize {
        let index = self.log.len();
        record.index = index;
        let wire = record.to_wire();
        self.log.push(record);
        self.emit(
            events::MUTATION,
            json!({
                "type": wire.mutation_type,
                "payload": wire.payload,
                "index": wire.index,
                "timestamp": wire.timestamp,
            }),
        );
        index
    }

    fn renumber(&mut self) {
        for (index, record) in self.log.iter_mut().enumerate() {
            record.index = index;
        }
    }

    fn clamp(&self, index: i64) -> i64 {
        index.clamp(BASE_INDEX, self.log.len() as i64 - 1)
    }

    fn send_init(&self) {
        let snapshot = self.store_snapshot();
        self.emit(events::INIT, Value::String(snapshot.to_wire_string()));
    }

    fn emit(&self, event: &str, payload: Value) {
        if let Err(e) = self.bridge.emit(event, payload) {
            warn!(event, error = %e, "Failed to send bridge message");
        }
    }
}

fn write_path(target: &mut Value, path: &ValuePath, value: Option<Value>) -> Result<()> {
    match value {
        Some(value) => {
            path.set(target, value)?;
        }
        None => {
            path.remove(target);
        }
    }
    Ok(())
}

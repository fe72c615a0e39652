//! Bounded cache of full-state checkpoints
//!
//! Entries are kept sorted by log index with at most one entry per index.
//! The base entry and pinned entries are permanent; every other entry is
//! evicted oldest-insertion first once the configured limit is exceeded.

use serde_json::Value;
use tracing::trace;

use crate::mutation::BASE_INDEX;

/// A cached state at a log index
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotCacheEntry {
    /// Log index the state was captured at
    pub index: i64,
    /// Full root state
    pub state: Value,
    /// Never evicted
    pub permanent: bool,
    inserted: u64,
}

/// Sorted snapshot store
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    entries: Vec<SnapshotCacheEntry>,
    limit: usize,
    next_seq: u64,
}

impl SnapshotCache {
    /// Create a cache holding `base` as its permanent entry
    pub fn new(base: Value, limit: usize) -> Self {
        let mut cache = Self {
            entries: Vec::new(),
            limit,
            next_seq: 0,
        };
        cache.reset(base);
        cache
    }

    /// Drop everything and start over from a new base state
    pub fn reset(&mut self, base: Value) {
        self.entries.clear();
        self.entries.push(SnapshotCacheEntry {
            index: BASE_INDEX,
            state: base,
            permanent: true,
            inserted: 0,
        });
        self.next_seq = 1;
    }

    /// Start over from `base` after the log was cut through `index`.
    ///
    /// Pinned entries past `index` are kept and shifted to the new numbering.
    pub fn rebase(&mut self, index: i64, base: Value) {
        let shift = index + 1;
        let pinned: Vec<(i64, Value)> = std::mem::take(&mut self.entries)
            .into_iter()
            .filter(|entry| entry.permanent && entry.index > index)
            .map(|entry| (entry.index - shift, entry.state))
            .collect();
        self.reset(base);
        for (at, state) in pinned {
            self.pin(at, state);
        }
    }

    /// The base state
    pub fn base(&self) -> &Value {
        // reset always installs the base entry first
        &self.entries[0].state
    }

    /// Nearest entry at or before `index`
    pub fn get(&self, index: i64) -> &SnapshotCacheEntry {
        let position = self.entries.partition_point(|entry| entry.index <= index);
        &self.entries[position.saturating_sub(1)]
    }

    /// Entry exactly at `index`
    pub fn get_exact(&self, index: i64) -> Option<&SnapshotCacheEntry> {
        self.entries
            .binary_search_by_key(&index, |entry| entry.index)
            .ok()
            .map(|position| &self.entries[position])
    }

    /// Cache `state` at `index`, replacing any non-permanent entry there
    pub fn put(&mut self, index: i64, state: Value) {
        if self.limit == 0 {
            return;
        }
        let inserted = self.next_seq;
        self.next_seq += 1;

        match self
            .entries
            .binary_search_by_key(&index, |entry| entry.index)
        {
            Ok(position) => {
                let entry = &mut self.entries[position];
                if entry.permanent {
                    return;
                }
                entry.state = state;
                entry.inserted = inserted;
            }
            Err(position) => {
                self.entries.insert(
                    position,
                    SnapshotCacheEntry {
                        index,
                        state,
                        permanent: false,
                        inserted,
                    },
                );
            }
        }
        trace!(index, entries = self.entries.len(), "Cached snapshot");
        self.evict();
    }

    /// Store `state` at `index` as a permanent entry, whatever the limit
    pub fn pin(&mut self, index: i64, state: Value) {
        let inserted = self.next_seq;
        self.next_seq += 1;
        let entry = SnapshotCacheEntry {
            index,
            state,
            permanent: true,
            inserted,
        };
        match self
            .entries
            .binary_search_by_key(&index, |entry| entry.index)
        {
            Ok(position) => self.entries[position] = entry,
            Err(position) => self.entries.insert(position, entry),
        }
        trace!(index, "Pinned snapshot");
    }

    /// Drop every entry after `index`, pinned ones included
    pub fn invalidate_after(&mut self, index: i64) {
        self.entries.retain(|entry| entry.index <= index);
    }

    /// Change the limit, evicting immediately if needed
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
        self.evict();
    }

    /// Maximum number of non-permanent entries
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of entries, base included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: the base entry is never removed
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached indices in ascending order
    pub fn indices(&self) -> Vec<i64> {
        self.entries.iter().map(|entry| entry.index).collect()
    }

    fn evict(&mut self) {
        loop {
            let transient = self.entries.iter().filter(|e| !e.permanent).count();
            if transient <= self.limit {
                return;
            }
            let oldest = self
                .entries
                .iter()
                .enumerate()
                .filter(|(_, entry)| !entry.permanent)
                .min_by_key(|(_, entry)| entry.inserted)
                .map(|(position, _)| position);
            match oldest {
                Some(position) => {
                    let evicted = self.entries.remove(position);
                    trace!(index = evicted.index, "Evicted snapshot");
                }
                None => return,
            }
        }
    }
}

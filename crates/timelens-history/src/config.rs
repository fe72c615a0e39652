//! History engine configuration

use serde::{Deserialize, Serialize};
use timelens_common::{Validatable, ValidationError};

/// Default checkpoint interval, in mutations
pub const DEFAULT_CACHE_EVERY: usize = 50;

/// Default number of non-permanent snapshots kept
pub const DEFAULT_CACHE_LIMIT: usize = 10;

/// Configuration for history recording and snapshot caching
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Cache a snapshot every N replayed mutations
    pub cache_every: usize,
    /// Maximum number of non-permanent snapshots; zero disables caching
    pub cache_limit: usize,
    /// Whether mutations are recorded
    pub recording: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            cache_every: DEFAULT_CACHE_EVERY,
            cache_limit: DEFAULT_CACHE_LIMIT,
            recording: true,
        }
    }
}

impl HistoryConfig {
    /// Configuration that never keeps intermediate snapshots
    pub fn uncached() -> Self {
        Self {
            cache_limit: 0,
            ..Self::default()
        }
    }
}

impl Validatable for HistoryConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.cache_every == 0 {
            return Err(ValidationError::out_of_range(
                "cache_every",
                "at least 1",
                self.cache_every,
            ));
        }
        Ok(())
    }
}

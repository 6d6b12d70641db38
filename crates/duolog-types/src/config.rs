//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for the synchronization engine.
///
/// Loaded from `{data_dir}/config.toml` by duolog-infra; every field has
/// a default so a missing or partial file still yields a working config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Bound on read operations (history list, chat-list build).
    pub read_timeout_ms: u64,
    /// Capacity of each broadcast topic in the live feed.
    pub feed_capacity: usize,
    /// Resync attempts after a live-subscription failure before the view
    /// is marked "live updates unavailable".
    pub live_max_retries: u32,
    /// Initial backoff between resync attempts; doubles per attempt.
    pub live_backoff_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: 5_000,
            feed_capacity: 256,
            live_max_retries: 5,
            live_backoff_ms: 200,
        }
    }
}

impl SyncConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn live_backoff(&self) -> Duration {
        Duration::from_millis(self.live_backoff_ms)
    }
}

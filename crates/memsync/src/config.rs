//! Sync layer configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default quiet period for search input coalescing.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Default per-key subscriber channel capacity.
pub const DEFAULT_CHANNEL_BUFFER: usize = 16;

/// Configuration for the sync layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncConfig {
    /// Base URL of the remote memory store.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Debounce quiet period for search input, in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Buffer size for per-key subscriber channels.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer: usize,
}

impl SyncConfig {
    /// Debounce quiet period as a [`Duration`].
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            debounce_ms: default_debounce_ms(),
            channel_buffer: default_channel_buffer(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_channel_buffer() -> usize {
    DEFAULT_CHANNEL_BUFFER
}

//! Configuration types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::watcher::DEFAULT_READ_CHUNK_BYTES;

/// Tuning for tail sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TailConfig {
    /// Window in milliseconds over which OS notifications are batched before
    /// they reach the session. 0 delivers raw notifications.
    pub notify_debounce_ms: u64,
    /// Largest byte range requested per read call.
    pub read_chunk_bytes: u64,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            notify_debounce_ms: 0,
            read_chunk_bytes: DEFAULT_READ_CHUNK_BYTES,
        }
    }
}

impl TailConfig {
    /// Notification batching window, if enabled.
    #[must_use]
    pub fn notify_debounce(&self) -> Option<Duration> {
        (self.notify_debounce_ms > 0).then(|| Duration::from_millis(self.notify_debounce_ms))
    }

    /// Read chunk size, never below one byte.
    #[must_use]
    pub fn read_chunk_bytes(&self) -> u64 {
        self.read_chunk_bytes.max(1)
    }
}

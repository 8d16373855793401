use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::retry::RetryPolicy;

/// Name of the file uploaded last in every directory unless configured otherwise.
pub const DEFAULT_ENTRY_POINT: &str = "index.html";

/// Uploads allowed in flight per directory unless configured otherwise.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Tuning knobs for one synchronisation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// File name scheduled after all of its siblings in each directory.
    pub entry_point: String,
    /// Maximum number of uploads in flight at once.
    pub concurrency: usize,
    pub retry: RetryPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            entry_point: DEFAULT_ENTRY_POINT.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            retry: RetryPolicy::default(),
        }
    }
}

impl SyncConfig {
    pub fn trace_loaded(&self) {
        info!(
            entry_point = %self.entry_point,
            concurrency = self.concurrency,
            max_attempts = self.retry.max_attempts,
            "Loaded SyncConfig"
        );
        debug!(?self, "SyncConfig loaded (full debug)");
    }
}

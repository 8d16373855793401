//! Per-run upload counters shared by every in-flight upload.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Final report of a run.
///
/// `file_count` and `total_bytes` only cover uploads the store confirmed.
/// `failed_files` is the authoritative list of what did not make it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadStats {
    pub folder_count: u64,
    pub file_count: u64,
    pub total_bytes: u64,
    pub failed_files: Vec<PathBuf>,
}

impl UploadStats {
    pub fn has_failures(&self) -> bool {
        !self.failed_files.is_empty()
    }
}

/// Increment-only aggregator behind an [`UploadStats`].
#[derive(Debug, Default)]
pub struct StatsAggregator {
    folder_count: AtomicU64,
    file_count: AtomicU64,
    total_bytes: AtomicU64,
    failed_files: Mutex<Vec<PathBuf>>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_folder(&self) {
        self.folder_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upload(&self, bytes: u64) {
        self.file_count.fetch_add(1, Ordering::Relaxed);
        self.total_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_failure(&self, path: PathBuf) {
        // A poisoned lock only means another recorder panicked mid-push; the Vec is still valid.
        let mut failed = self
            .failed_files
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        failed.push(path);
    }

    pub fn snapshot(&self) -> UploadStats {
        let failed_files = self
            .failed_files
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        UploadStats {
            folder_count: self.folder_count.load(Ordering::Relaxed),
            file_count: self.file_count.load(Ordering::Relaxed),
            total_bytes: self.total_bytes.load(Ordering::Relaxed),
            failed_files,
        }
    }

    pub fn into_stats(self) -> UploadStats {
        UploadStats {
            folder_count: self.folder_count.into_inner(),
            file_count: self.file_count.into_inner(),
            total_bytes: self.total_bytes.into_inner(),
            failed_files: self
                .failed_files
                .into_inner()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        }
    }
}

//! High-level pipeline: walks a local tree and publishes it to an object store.
//!
//! This module provides the top-level orchestration of a run. It:
//!   - Walks the local root depth-first with [`walk::walk`], one directory batch at a time
//!   - Uploads each batch through a [`ConcurrencyScheduler`] window, entry point last
//!   - Retries failed uploads with [`RetryingUploader`]
//!   - Aggregates and returns an [`UploadStats`] report
//!
//! # Ordering
//! Every subdirectory's subtree is finished before the parent's own files are
//! submitted, and a batch is fully drained before the next one starts. Inside a
//! batch the entry-point file is *issued* after its siblings; with more siblings
//! than `concurrency - 1` a sibling can still complete after it.
//!
//! # Error Handling
//! Only traversal failures abort a run ([`SyncError`]). A file that cannot be
//! uploaded after all retries is listed in [`UploadStats::failed_files`] and the
//! run carries on; callers must inspect that list to detect a degraded run.
//!
//! # Navigation
//! - Main entrypoint: [`synchronise`]
//! - Supporting types: [`SyncConfig`], [`UploadStats`], [`SyncError`].

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::contract::ObjectStore;
use crate::retry::RetryingUploader;
use crate::scheduler::ConcurrencyScheduler;
use crate::stats::{StatsAggregator, UploadStats};
use crate::walk::{self, DirectoryBatch};

/// A failure that aborts the whole run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("cannot list directory {}: {source}", path.display())]
    ListDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} is not a directory", path.display())]
    NotADirectory { path: PathBuf },
}

/// Publish every file below `local_root` under the `remote_root` key prefix.
///
/// Returns the run's report, partial failures included. Fails only when a
/// directory of the tree cannot be listed.
pub async fn synchronise<S>(
    store: &S,
    local_root: &Path,
    remote_root: &str,
    config: &SyncConfig,
) -> Result<UploadStats, SyncError>
where
    S: ObjectStore + ?Sized,
{
    info!(
        local_root = %local_root.display(),
        remote_root,
        concurrency = config.concurrency,
        "[SYNC] Starting synchronisation"
    );
    let started = Instant::now();

    match tokio::fs::metadata(local_root).await {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            error!(path = %local_root.display(), "[SYNC][ERROR] Local root is not a directory");
            return Err(SyncError::NotADirectory {
                path: local_root.to_path_buf(),
            });
        }
        Err(source) => {
            error!(path = %local_root.display(), error = %source, "[SYNC][ERROR] Cannot access local root");
            return Err(SyncError::ListDirectory {
                path: local_root.to_path_buf(),
                source,
            });
        }
    }

    let stats = StatsAggregator::new();
    let uploader = RetryingUploader::new(store, config.retry, &stats);

    for batch in walk::walk(local_root, remote_root, config.entry_point.as_str()) {
        let batch = batch.map_err(|e| {
            error!(error = %e, "[SYNC][ERROR] Directory traversal failed, aborting");
            e
        })?;
        stats.record_folder();
        upload_batch(&uploader, &stats, batch, config).await;
    }

    let report = stats.into_stats();
    info!(
        folders = report.folder_count,
        files = report.file_count,
        bytes = report.total_bytes,
        failed = report.failed_files.len(),
        elapsed = ?started.elapsed(),
        "[SYNC] Synchronisation complete"
    );
    if report.has_failures() {
        warn!(failed = ?report.failed_files, "[SYNC] Some files could not be uploaded");
    }
    Ok(report)
}

async fn upload_batch<S>(
    uploader: &RetryingUploader<'_, S>,
    stats: &StatsAggregator,
    batch: DirectoryBatch,
    config: &SyncConfig,
) where
    S: ObjectStore + ?Sized,
{
    for path in batch.unreadable {
        stats.record_failure(path);
    }
    if batch.files.is_empty() {
        return;
    }

    let mut scheduler = ConcurrencyScheduler::new(config.concurrency);
    let has_entry_point = batch
        .files
        .last()
        .is_some_and(|task| task.local_path.file_name() == Some(OsStr::new(&config.entry_point)));
    if has_entry_point && batch.files.len() > scheduler.limit() {
        debug!(
            dir = %batch.local_dir.display(),
            files = batch.files.len(),
            concurrency = scheduler.limit(),
            "[SYNC] Entry point is issued last but may not finish last"
        );
    }

    for task in batch.files {
        scheduler.submit(uploader.upload(task)).await;
    }
    let outcomes = scheduler.drain().await;
    let failed = outcomes.iter().filter(|outcome| outcome.is_err()).count();
    debug!(
        dir = %batch.local_dir.display(),
        uploaded = outcomes.len() - failed,
        failed,
        "[SYNC] Directory finished"
    );
}

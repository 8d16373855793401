//! Bounded retry around a single file upload.
//!
//! A failed `put` is retried with a linear backoff (`attempt * base_delay`) until
//! [`RetryPolicy::max_attempts`] calls have been made. Exhausting the attempts is
//! terminal for that file only: it is recorded in the run's stats and the caller
//! moves on.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::contract::{ObjectStore, PutError, UploadTask};
use crate::stats::StatsAggregator;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total number of `put` calls allowed for one file, the first included.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Wait after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Progress of one file through its retries.
#[derive(Debug, Clone, Copy)]
struct RetryState {
    attempt: u32,
    max_attempts: u32,
}

impl RetryState {
    fn first(policy: &RetryPolicy) -> Self {
        Self {
            attempt: 1,
            max_attempts: policy.max_attempts.max(1),
        }
    }

    fn can_retry(&self) -> bool {
        self.attempt < self.max_attempts
    }
}

/// Terminal outcome of a file that could not be published.
#[derive(Debug, Error)]
pub enum UploadFailure {
    #[error("cannot read size of {}: {source}", path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("upload of {} failed after {attempts} attempts: {source}", path.display())]
    Exhausted {
        path: PathBuf,
        attempts: u32,
        #[source]
        source: PutError,
    },
}

impl UploadFailure {
    pub fn path(&self) -> &PathBuf {
        match self {
            UploadFailure::Metadata { path, .. } | UploadFailure::Exhausted { path, .. } => path,
        }
    }
}

/// Publishes one [`UploadTask`] at a time, retrying and recording the outcome.
pub struct RetryingUploader<'a, S: ?Sized> {
    store: &'a S,
    policy: RetryPolicy,
    stats: &'a StatsAggregator,
}

impl<'a, S> RetryingUploader<'a, S>
where
    S: ObjectStore + ?Sized,
{
    pub fn new(store: &'a S, policy: RetryPolicy, stats: &'a StatsAggregator) -> Self {
        Self {
            store,
            policy,
            stats,
        }
    }

    /// Upload `task`, returning the number of bytes published.
    ///
    /// Success adds the file to `file_count`/`total_bytes`; a terminal failure
    /// appends its local path to `failed_files`. Either way the task is done.
    pub async fn upload(&self, task: UploadTask) -> Result<u64, UploadFailure> {
        let result = self.try_upload(&task).await;
        match &result {
            Ok(size) => self.stats.record_upload(*size),
            Err(e) => {
                error!(path = %task.local_path.display(), error = %e, "[UPLOAD][ERROR] Giving up on file");
                self.stats.record_failure(task.local_path.clone());
            }
        }
        result
    }

    async fn try_upload(&self, task: &UploadTask) -> Result<u64, UploadFailure> {
        let size = tokio::fs::metadata(&task.local_path)
            .await
            .map_err(|source| UploadFailure::Metadata {
                path: task.local_path.clone(),
                source,
            })?
            .len();

        let mut state = RetryState::first(&self.policy);
        loop {
            let started = Instant::now();
            match self.store.put(&task.remote_key, &task.local_path).await {
                Ok(()) => {
                    info!(
                        path = %task.local_path.display(),
                        key = %task.remote_key,
                        size,
                        elapsed = ?started.elapsed(),
                        attempt = state.attempt,
                        "[UPLOAD] File uploaded"
                    );
                    return Ok(size);
                }
                Err(e) if state.can_retry() => {
                    let delay = self.policy.delay_for(state.attempt);
                    warn!(
                        path = %task.local_path.display(),
                        attempt = state.attempt,
                        max_attempts = state.max_attempts,
                        delay = ?delay,
                        error = %e,
                        "[UPLOAD] Upload failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    state.attempt += 1;
                }
                Err(e) => {
                    return Err(UploadFailure::Exhausted {
                        path: task.local_path.clone(),
                        attempts: state.attempt,
                        source: e,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::MockObjectStore;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn delays_grow_linearly() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(3000));
    }

    #[test]
    fn policy_always_allows_one_attempt() {
        assert_eq!(RetryPolicy::new(0, DEFAULT_BASE_DELAY).max_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_third_attempt_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "app.js", b"console.log(1)");

        let calls: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));
        let recorded = calls.clone();
        let mut store = MockObjectStore::new();
        store
            .expect_put()
            .times(3)
            .returning(move |_key: &str, _path: &Path| {
                let mut calls = recorded.lock().unwrap();
                calls.push(Instant::now());
                if calls.len() < 3 {
                    Err("connection reset".into())
                } else {
                    Ok(())
                }
            });

        let stats = StatsAggregator::new();
        let uploader = RetryingUploader::new(&store, RetryPolicy::default(), &stats);
        let size = uploader
            .upload(UploadTask::new(&path, "site/app.js"))
            .await
            .expect("third attempt should succeed");
        assert_eq!(size, 14);

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        let first_gap = calls[1] - calls[0];
        let second_gap = calls[2] - calls[1];
        assert!(first_gap >= Duration::from_millis(1000) && first_gap < Duration::from_millis(1100));
        assert!(second_gap >= Duration::from_millis(2000) && second_gap < Duration::from_millis(2100));

        let report = stats.snapshot();
        assert_eq!(report.file_count, 1);
        assert_eq!(report.total_bytes, 14);
        assert!(report.failed_files.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_record_the_path_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "logo.png", b"png");

        let mut store = MockObjectStore::new();
        store
            .expect_put()
            .times(3)
            .returning(|_key: &str, _path: &Path| Err("503 Service Unavailable".into()));

        let stats = StatsAggregator::new();
        let uploader = RetryingUploader::new(&store, RetryPolicy::default(), &stats);
        let err = uploader
            .upload(UploadTask::new(&path, "logo.png"))
            .await
            .expect_err("every attempt fails");
        assert!(matches!(err, UploadFailure::Exhausted { attempts: 3, .. }));
        assert_eq!(err.path(), &path);

        let report = stats.snapshot();
        assert_eq!(report.file_count, 0);
        assert_eq!(report.total_bytes, 0);
        assert_eq!(report.failed_files, vec![path]);
    }

    #[tokio::test]
    async fn missing_file_fails_without_calling_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.txt");

        let mut store = MockObjectStore::new();
        store.expect_put().never();

        let stats = StatsAggregator::new();
        let uploader = RetryingUploader::new(&store, RetryPolicy::default(), &stats);
        let err = uploader
            .upload(UploadTask::new(&path, "gone.txt"))
            .await
            .expect_err("metadata read must fail");
        assert!(matches!(err, UploadFailure::Metadata { .. }));
        assert_eq!(stats.snapshot().failed_files, vec![path]);
    }
}

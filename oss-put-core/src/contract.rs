//! # contract: the object-store seam
//!
//! The engine never talks to a network directly. Everything it needs from a
//! remote bucket is the single capability described by [`ObjectStore`]:
//! "store the bytes of this local file under this key".
//!
//! ## Interface & Extensibility
//! - Implement [`ObjectStore`] to publish into a new backend (OSS, S3, a local
//!   directory for dry runs, a test double).
//! - Each `put` is treated as atomic and fallible. Transport, authentication,
//!   timeouts and protocol-level retries belong to the implementor.
//! - Errors are boxed trait objects; the engine only logs them and decides
//!   whether to retry.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall`, so [`MockObjectStore`] is available
//!   to unit tests and, through the `test-export-mocks` feature, to dependents.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// Error returned by an [`ObjectStore`] when a single `put` fails.
pub type PutError = Box<dyn std::error::Error + Send + Sync>;

/// One file to publish: where it lives locally and which key it gets remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
    pub local_path: PathBuf,
    pub remote_key: String,
}

impl UploadTask {
    pub fn new(local_path: impl Into<PathBuf>, remote_key: impl Into<String>) -> Self {
        Self {
            local_path: local_path.into(),
            remote_key: remote_key.into(),
        }
    }
}

/// Capability to put an object into a bucket.
///
/// The trait is implemented by real clients and by test mocks. It is `Send` +
/// `Sync` so a single store can be shared by every in-flight upload of a run.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload the file at `local_path` under `key`, overwriting any existing object.
    async fn put(&self, key: &str, local_path: &Path) -> Result<(), PutError>;
}


#![doc = "oss-put-core: directory-to-object-store synchronisation engine for oss-put."]

//! This crate contains the engine behind `oss-put`: the directory walk, the
//! bounded upload window, the retry policy and the run statistics. It performs no
//! network I/O itself; every upload goes through an [`contract::ObjectStore`]
//! supplied by the caller.
//!
//! # Usage
//! Build a [`config::SyncConfig`], pick an `ObjectStore` implementation and call
//! [`synchronise::synchronise`].

pub mod config;
pub mod contract;
pub mod retry;
pub mod scheduler;
pub mod stats;
pub mod synchronise;
pub mod walk;

pub use config::SyncConfig;
pub use contract::{ObjectStore, PutError, UploadTask};
pub use stats::UploadStats;
pub use synchronise::{synchronise, SyncError};

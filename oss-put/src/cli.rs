//! # oss-put CLI Interface (Module)
//!
//! This module implements the command-line surface of oss-put: argument
//! parsing, config merging and the async [`run`] entrypoint shared by `main` and
//! the integration tests.
//!
//! All engine logic (walking, scheduling, retries, statistics) lives in
//! `oss-put-core`. This module is strictly glue: it resolves settings, builds an
//! [`OssClient`] and reports the outcome.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use oss_put_core::synchronise::synchronise;
use oss_put_core::UploadStats;

use crate::load_config::{load_file_config, resolve};
use crate::report;
use crate::upload::OssClient;

/// Upload a local folder to an Alibaba Cloud OSS bucket, `index.html` last.
#[derive(Parser, Debug, Default)]
#[clap(
    name = "oss-put",
    version,
    about = "Upload files or folders to Alibaba Cloud OSS"
)]
pub struct Cli {
    /// Config file (JSON or YAML); defaults to ./oss-put-config.json when present
    #[clap(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Alibaba Cloud OSS access key ID
    #[clap(long, env = "OSS_PUT_KEY")]
    pub key: Option<String>,

    /// Alibaba Cloud OSS access key secret
    #[clap(long, env = "OSS_PUT_SECRET", hide_env_values = true)]
    pub secret: Option<String>,

    /// OSS bucket name
    #[clap(long, env = "OSS_PUT_BUCKET")]
    pub bucket: Option<String>,

    /// The region where the OSS service is located (e.g. cn-hangzhou)
    #[clap(long, env = "OSS_PUT_REGION")]
    pub region: Option<String>,

    /// Root path in OSS ("/" for the bucket root)
    #[clap(long = "oss-path", alias = "ossPath")]
    pub oss_path: Option<String>,

    /// Local folder path
    #[clap(long = "local-path", alias = "localPath")]
    pub local_path: Option<PathBuf>,

    /// Endpoint URL overriding the public one derived from bucket and region
    #[clap(long, env = "OSS_PUT_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Maximum number of uploads in flight
    #[clap(long)]
    pub concurrency: Option<usize>,

    /// Attempts per file before it is reported as failed
    #[clap(long)]
    pub max_attempts: Option<u32>,

    /// File uploaded last in every directory
    #[clap(long)]
    pub entry_point: Option<String>,

    /// Per-request timeout in milliseconds
    #[clap(long)]
    pub timeout_millis: Option<u64>,

    /// Print the final report as JSON on stdout
    #[clap(long)]
    pub json: bool,
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<UploadStats> {
    tracing::info!("trace_initialised");

    let file_config = load_file_config(cli.config.as_deref())?;
    let settings = resolve(&cli, file_config)?;
    settings.sync.trace_loaded();

    let client = match settings.endpoint.as_deref() {
        Some(endpoint) => OssClient::with_endpoint(endpoint, settings.oss.clone()),
        None => OssClient::new(settings.oss.clone()),
    }
    .map_err(|e| anyhow!("Failed to construct OSS client: {e}"))?;

    let started = Instant::now();
    let stats = synchronise(
        &client,
        &settings.local_path,
        &settings.oss_path,
        &settings.sync,
    )
    .await
    .with_context(|| format!("Upload of {} aborted", settings.local_path.display()))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print!("{}", report::render(&stats, client.bucket(), started.elapsed()));
    }
    Ok(stats)
}

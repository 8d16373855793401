//! `load_config` module: loads an optional config file and merges it with CLI flags
//! into the settings of one upload run.
//!
//! # Responsibilities
//! - Read `oss-put-config.json` from the working directory, or the file given
//!   with `--config` (JSON, or YAML when the extension is `.yaml`/`.yml`)
//! - Merge it with command-line flags and environment variables; flags win
//! - Validate that every required setting is present, reporting all missing
//!   names at once
//!
//! # Errors
//! All errors use `anyhow::Error` and are surfaced at the CLI boundary. A missing
//! or unreadable *default* config file is not an error; an explicit one is.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use oss_put_core::retry::RetryPolicy;
use oss_put_core::SyncConfig;
use serde::Deserialize;
use tracing::{info, warn};

use crate::cli::Cli;
use crate::upload::{OssSettings, DEFAULT_TIMEOUT};

/// Looked up in the working directory when `--config` is not given.
pub const CONFIG_FILE_NAME: &str = "oss-put-config.json";

/// On-disk config. Every field is optional so flags can fill the gaps.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileConfig {
    pub key: Option<String>,
    pub secret: Option<String>,
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub oss_path: Option<String>,
    pub local_path: Option<PathBuf>,
    pub endpoint: Option<String>,
    pub concurrency: Option<usize>,
    pub max_attempts: Option<u32>,
    pub entry_point: Option<String>,
    pub timeout_millis: Option<u64>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub oss: OssSettings,
    pub endpoint: Option<String>,
    pub oss_path: String,
    pub local_path: PathBuf,
    pub sync: SyncConfig,
}

/// Load the config file named by `explicit`, or the default one if it exists.
pub fn load_file_config(explicit: Option<&Path>) -> Result<FileConfig> {
    match explicit {
        Some(path) => read_config(path),
        None => {
            let path = Path::new(CONFIG_FILE_NAME);
            if !path.exists() {
                info!(config_path = ?path, "No default config file, using flags only");
                return Ok(FileConfig::default());
            }
            read_config(path).or_else(|e| {
                warn!(error = %e, config_path = ?path, "Ignoring unreadable default config file");
                Ok(FileConfig::default())
            })
        }
    }
}

fn read_config(path: &Path) -> Result<FileConfig> {
    info!(config_path = ?path, "Loading configuration from file");
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    );
    let config = if is_yaml {
        serde_yaml::from_str(&content).map_err(|e| anyhow!("Failed to parse config YAML: {e}"))?
    } else {
        serde_json::from_str(&content).map_err(|e| anyhow!("Failed to parse config JSON: {e}"))?
    };
    info!(config_path = ?path, "Parsed config file successfully");
    Ok(config)
}

/// Merge flags over `file` and check the required settings.
pub fn resolve(cli: &Cli, file: FileConfig) -> Result<RunSettings> {
    fn pick(flag: &Option<String>, file: Option<String>) -> Option<String> {
        flag.clone()
            .or(file)
            .filter(|value| !value.trim().is_empty())
    }

    let key = pick(&cli.key, file.key);
    let secret = pick(&cli.secret, file.secret);
    let bucket = pick(&cli.bucket, file.bucket);
    let region = pick(&cli.region, file.region);
    let oss_path = pick(&cli.oss_path, file.oss_path);
    let endpoint = pick(&cli.endpoint, file.endpoint);
    let local_path = cli
        .local_path
        .clone()
        .or(file.local_path)
        .filter(|path| !path.as_os_str().is_empty());

    let missing: Vec<&str> = [
        ("key", key.is_none()),
        ("secret", secret.is_none()),
        ("bucket", bucket.is_none()),
        ("region", region.is_none()),
        ("ossPath", oss_path.is_none()),
        ("localPath", local_path.is_none()),
    ]
    .into_iter()
    .filter_map(|(name, absent)| absent.then_some(name))
    .collect();

    let (Some(key), Some(secret), Some(bucket), Some(region), Some(oss_path), Some(local_path)) =
        (key, secret, bucket, region, oss_path, local_path)
    else {
        return Err(anyhow!("missing required settings: {}", missing.join(", ")));
    };

    let defaults = SyncConfig::default();
    let sync = SyncConfig {
        entry_point: cli
            .entry_point
            .clone()
            .or(file.entry_point)
            .unwrap_or(defaults.entry_point),
        concurrency: cli
            .concurrency
            .or(file.concurrency)
            .unwrap_or(defaults.concurrency)
            .max(1),
        retry: RetryPolicy::new(
            cli.max_attempts
                .or(file.max_attempts)
                .unwrap_or(defaults.retry.max_attempts),
            defaults.retry.base_delay,
        ),
    };
    let timeout = cli
        .timeout_millis
        .or(file.timeout_millis)
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_TIMEOUT);

    Ok(RunSettings {
        oss: OssSettings {
            region,
            access_key_id: key,
            access_key_secret: secret,
            bucket,
            timeout,
        },
        endpoint,
        oss_path,
        local_path,
        sync,
    })
}

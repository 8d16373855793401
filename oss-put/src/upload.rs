#![doc = "Object store integration for the CLI: an Alibaba Cloud OSS client implementing the core `ObjectStore` trait."]
//
//! # OSS client (CLI <-> Core)
//!
//! This module provides the bridge between the CLI workflow and the
//! [`oss_put_core::contract::ObjectStore`] abstraction. [`OssClient`] issues
//! `PutObject` requests against a bucket endpoint, signed with the access key
//! pair (OSS header signature, HMAC-SHA1).
//!
//! - Construct [`OssClient`] from [`OssSettings`]; the endpoint is derived from
//!   the bucket and region unless [`OssClient::with_endpoint`] is used.
//! - Transport timeouts are enforced by the HTTP client and surface as ordinary
//!   put errors, which the engine retries.

use std::path::Path;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use oss_put_core::contract::{ObjectStore, PutError};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, DATE};
use ring::hmac;
use url::Url;

/// Default per-request timeout, matching the two minutes deployments are tuned for.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Everything needed to talk to one bucket.
#[derive(Clone)]
pub struct OssSettings {
    /// Region id, with or without the `oss-` prefix (e.g. `cn-hangzhou`).
    pub region: String,
    pub access_key_id: String,
    pub access_key_secret: String,
    pub bucket: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for OssSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OssSettings")
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Virtual-hosted endpoint of `bucket` in `region`.
pub fn endpoint_for(bucket: &str, region: &str) -> String {
    let region = region.trim();
    if region.starts_with("oss-") {
        format!("https://{bucket}.{region}.aliyuncs.com")
    } else {
        format!("https://{bucket}.oss-{region}.aliyuncs.com")
    }
}

/// `StringToSign` of a header-signed request without `x-oss-*` headers.
pub fn string_to_sign(verb: &str, content_type: &str, date: &str, bucket: &str, key: &str) -> String {
    format!("{verb}\n\n{content_type}\n{date}\n/{bucket}/{key}")
}

/// Base64 HMAC-SHA1 of `string_to_sign`.
pub fn sign(secret: &hmac::Key, string_to_sign: &str) -> String {
    STANDARD.encode(hmac::sign(secret, string_to_sign.as_bytes()).as_ref())
}

pub struct OssClient {
    http: reqwest::Client,
    base_url: Url,
    bucket: String,
    access_key_id: String,
    secret: hmac::Key,
}

impl OssClient {
    pub fn new(settings: OssSettings) -> Result<Self, PutError> {
        let endpoint = endpoint_for(&settings.bucket, &settings.region);
        Self::with_endpoint(&endpoint, settings)
    }

    /// Use `endpoint` as the bucket's base URL instead of the public OSS host.
    pub fn with_endpoint(endpoint: &str, settings: OssSettings) -> Result<Self, PutError> {
        let base_url = Url::parse(endpoint).map_err(|e| {
            tracing::error!(error = ?e, endpoint, "Invalid OSS endpoint");
            e
        })?;
        if base_url.cannot_be_a_base() {
            return Err(format!("OSS endpoint {endpoint} cannot be used as a base URL").into());
        }
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        tracing::info!(
            endpoint = %base_url,
            bucket = %settings.bucket,
            timeout = ?settings.timeout,
            "Initialized OssClient"
        );
        Ok(OssClient {
            http,
            base_url,
            secret: hmac::Key::new(
                hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY,
                settings.access_key_secret.as_bytes(),
            ),
            bucket: settings.bucket,
            access_key_id: settings.access_key_id,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn object_url(&self, key: &str) -> Result<Url, PutError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| format!("OSS endpoint {} cannot be a base", self.base_url))?
            .pop_if_empty()
            .extend(key.split('/'));
        Ok(url)
    }

    fn authorization(&self, verb: &str, content_type: &str, date: &str, key: &str) -> String {
        let to_sign = string_to_sign(verb, content_type, date, &self.bucket, key);
        format!("OSS {}:{}", self.access_key_id, sign(&self.secret, &to_sign))
    }
}

#[async_trait]
impl ObjectStore for OssClient {
    async fn put(&self, key: &str, local_path: &Path) -> Result<(), PutError> {
        let body = tokio::fs::read(local_path).await?;
        let content_type = mime_guess::from_path(local_path)
            .first_or_octet_stream()
            .to_string();
        let date = httpdate::fmt_http_date(SystemTime::now());
        let url = self.object_url(key)?;

        tracing::debug!(
            key,
            %url,
            content_type = %content_type,
            size = body.len(),
            "Sending PutObject"
        );
        let response = self
            .http
            .put(url)
            .header(CONTENT_TYPE, &content_type)
            .header(DATE, &date)
            .header(AUTHORIZATION, self.authorization("PUT", &content_type, &date, key))
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let detail = response.text().await.unwrap_or_default();
        tracing::debug!(key, %status, body = %detail, "PutObject rejected");
        Err(format!("PutObject {key} returned {status}: {}", detail.trim()).into())
    }
}

//! Remote access to hugo releases.
//!
//! [`ReleaseSource`] is the seam between provisioning logic and the network:
//! it answers "what is the latest tag" and "stream this artifact into that
//! file". [`GithubReleases`] is the production implementation over reqwest,
//! streaming response bodies to disk chunk by chunk with URL validation.

use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use crate::error::{HugoError, Result};

/// GitHub API endpoint describing the latest hugo release.
pub const LATEST_RELEASE_API: &str = "https://api.github.com/repos/gohugoio/hugo/releases/latest";

const USER_AGENT: &str = concat!("hugorun/", env!("CARGO_PKG_VERSION"));

/// Allowed domains for downloading releases.
const ALLOWED_DOMAINS: &[&str] = &["github.com"];

// ============================================================================
// Release Source
// ============================================================================

/// Where release metadata and artifacts come from.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Returns the raw `tag_name` of the latest release, e.g. `v0.145.0`.
    ///
    /// Fails with [`HugoError::VersionLookup`].
    async fn latest_tag(&self) -> Result<String>;

    /// Streams the artifact at `url` into `dest`, returning the bytes written.
    ///
    /// Fails with [`HugoError::Download`].
    async fn download(&self, url: &str, dest: &Path) -> Result<u64>;
}

// ============================================================================
// URL Security Validation
// ============================================================================

/// Validates that a URL is safe for downloading.
///
/// Checks:
/// - URL scheme must be HTTPS
/// - Host must be in the allowed domain list
fn validate_url(url_str: &str) -> anyhow::Result<()> {
    let url = Url::parse(url_str).with_context(|| format!("Invalid URL: {}", url_str))?;

    if url.scheme() != "https" {
        anyhow::bail!("URL must use HTTPS: {}", url_str);
    }

    let host = url
        .host_str()
        .ok_or_else(|| anyhow::anyhow!("URL must have a host: {}", url_str))?;

    let is_allowed = ALLOWED_DOMAINS
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{}", domain)));

    if !is_allowed {
        anyhow::bail!(
            "Download domain not allowed: {}. Allowed: {:?}",
            host,
            ALLOWED_DOMAINS
        );
    }

    Ok(())
}

// ============================================================================
// GitHub Releases
// ============================================================================

#[derive(Debug, Deserialize)]
struct LatestRelease {
    tag_name: Option<String>,
}

/// Release source backed by github.com.
#[derive(Debug, Clone)]
pub struct GithubReleases {
    client: Client,
    latest_api_url: String,
}

impl GithubReleases {
    pub fn new() -> Result<Self> {
        Self::with_latest_api_url(LATEST_RELEASE_API)
    }

    /// Uses a different "latest release" endpoint (mirrors, GitHub Enterprise).
    pub fn with_latest_api_url(latest_api_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| HugoError::download_caused("Cannot create HTTP client", e))?;

        Ok(Self {
            client,
            latest_api_url: latest_api_url.into(),
        })
    }

    fn api_request(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json");

        match std::env::var("GITHUB_TOKEN").or_else(|_| std::env::var("GH_TOKEN")) {
            Ok(token) => request.bearer_auth(token),
            Err(_) => request,
        }
    }

    async fn stream_to_file(&self, url: &str, dest: &Path) -> anyhow::Result<u64> {
        validate_url(url)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to start download from {}", url))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!(
                "Download of {} failed with status {}: {}",
                url,
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown error")
            );
        }

        debug!("Content-Length: {:?}", response.content_length());

        let mut file = File::create(dest)
            .await
            .with_context(|| format!("Failed to create file: {}", dest.display()))?;

        let mut stream = response.bytes_stream();
        let mut bytes_downloaded: u64 = 0;

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.with_context(|| format!("Failed to read body of {}", url))?;

            file.write_all(&chunk)
                .await
                .with_context(|| format!("Failed to write to {}", dest.display()))?;

            bytes_downloaded += chunk.len() as u64;
        }

        file.flush().await.context("Failed to flush file")?;

        Ok(bytes_downloaded)
    }
}

#[async_trait]
impl ReleaseSource for GithubReleases {
    async fn latest_tag(&self) -> Result<String> {
        let url = self.latest_api_url.as_str();
        debug!(%url, "Fetching latest hugo release");

        let response = self.api_request(url).send().await.map_err(|e| {
            HugoError::version_lookup_caused(format!("Cannot reach '{}'", url), e)
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HugoError::version_lookup(format!(
                "'{}' responded with HTTP {}",
                url, status
            )));
        }

        let release: LatestRelease = response.json().await.map_err(|e| {
            HugoError::version_lookup_caused(format!("Cannot parse JSON of '{}'", url), e)
        })?;

        release
            .tag_name
            .ok_or_else(|| {
                HugoError::version_lookup(format!("'{}' does not contain a valid version name", url))
            })
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        info!("Downloading {} to {}", url, dest.display());

        let bytes = self.stream_to_file(url, dest).await.map_err(|e| {
            HugoError::download_caused(
                format!(
                    "Cannot download hugo from {} [os: {}, arch: {}]: {:#}",
                    url,
                    std::env::consts::OS,
                    std::env::consts::ARCH,
                    e
                ),
                e,
            )
        })?;

        info!(
            "Download complete: {} bytes written to {}",
            bytes,
            dest.display()
        );
        Ok(bytes)
    }
}

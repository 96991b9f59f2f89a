//! Version requests and "latest" resolution.
//!
//! A request is either an exact semantic version or the `latest` sentinel.
//! Resolving `latest` asks the [`ReleaseSource`] for the newest tag, guarded
//! by a single-line cache file whose modification time decides freshness.
//! The cache file is neither locked nor written atomically; concurrent
//! resolvers may race and the last write wins.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use semver::Version;
use tracing::{debug, info, warn};

use crate::error::{HugoError, Result};
use crate::source::ReleaseSource;

/// Sentinel accepted (case-insensitively) for "newest release".
pub const LATEST: &str = "latest";

/// Default time a resolved "latest" version is reused.
pub const DEFAULT_LATEST_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

// ============================================================================
// Version Request
// ============================================================================

/// Which hugo version the caller asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRequest {
    Latest,
    Exact(Version),
}

impl VersionRequest {
    /// Parses a requested version.
    ///
    /// Blank input and `latest` (any case) mean [`VersionRequest::Latest`];
    /// a single leading `v` is tolerated on exact versions.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(LATEST) {
            return Ok(Self::Latest);
        }

        parse_version(trimmed).map(Self::Exact).ok_or_else(|| {
            HugoError::configuration(format!(
                "Hugo version '{}' is not a valid semantic version",
                trimmed
            ))
        })
    }
}

impl Default for VersionRequest {
    fn default() -> Self {
        Self::Latest
    }
}

impl FromStr for VersionRequest {
    type Err = HugoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => write!(f, "{}", LATEST),
            Self::Exact(version) => write!(f, "{}", version),
        }
    }
}

fn parse_version(raw: &str) -> Option<Version> {
    let raw = raw.trim();
    let raw = raw.strip_prefix('v').unwrap_or(raw);
    Version::parse(raw).ok()
}

// ============================================================================
// Version Resolver
// ============================================================================

/// Resolves version requests, caching the answer for `latest` on disk.
#[derive(Clone)]
pub struct VersionResolver {
    source: Arc<dyn ReleaseSource>,
    cache_file: PathBuf,
    cache_ttl: Option<Duration>,
}

impl fmt::Debug for VersionResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionResolver")
            .field("cache_file", &self.cache_file)
            .field("cache_ttl", &self.cache_ttl)
            .finish_non_exhaustive()
    }
}

impl VersionResolver {
    /// Creates a resolver caching `latest` in `cache_file` for one hour.
    pub fn new(source: Arc<dyn ReleaseSource>, cache_file: impl Into<PathBuf>) -> Self {
        Self {
            source,
            cache_file: cache_file.into(),
            cache_ttl: Some(DEFAULT_LATEST_CACHE_TTL),
        }
    }

    /// Sets how long a cached `latest` stays valid; zero disables caching.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = (!ttl.is_zero()).then_some(ttl);
        self
    }

    pub fn cache_file(&self) -> &Path {
        &self.cache_file
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl
    }

    /// Turns a request into a concrete version.
    pub async fn resolve_version(&self, request: &VersionRequest) -> Result<Version> {
        match request {
            VersionRequest::Exact(version) => Ok(version.clone()),
            VersionRequest::Latest => self.resolve_latest().await,
        }
    }

    /// Resolves the newest release, preferring a fresh cache entry.
    pub async fn resolve_latest(&self) -> Result<Version> {
        debug!("Retrieve latest hugo version...");

        if let Some(cached) = self.read_cached().await? {
            debug!(version = %cached, "Latest hugo version retrieved from cache");
            return Ok(cached);
        }

        let tag = self.source.latest_tag().await?;
        let version = parse_tag(&tag)?;

        info!(version = %version, "Latest hugo version retrieved");

        if let Err(e) = self.write_cached(&version).await {
            warn!(
                "Cannot store latest hugo version in {} ({}); this will be ignored for now",
                self.cache_file.display(),
                e
            );
        }

        Ok(version)
    }

    async fn read_cached(&self) -> Result<Option<Version>> {
        let Some(ttl) = self.cache_ttl else {
            return Ok(None);
        };

        let read_error = |e: io::Error| {
            HugoError::version_lookup_caused(
                format!(
                    "Cannot read cached hugo version from '{}'",
                    self.cache_file.display()
                ),
                e,
            )
        };

        let modified = match tokio::fs::metadata(&self.cache_file).await {
            Ok(metadata) => metadata.modified().map_err(read_error)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(read_error(e)),
        };

        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        if age >= ttl {
            debug!(?age, ?ttl, "Cached latest hugo version is stale");
            return Ok(None);
        }

        let bytes = match tokio::fs::read(&self.cache_file).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(read_error(e)),
        };

        // Not UTF-8 is as unusable as unparsable: treat it as a miss.
        let Ok(content) = String::from_utf8(bytes) else {
            debug!("Cached latest hugo version is not UTF-8, ignoring it");
            return Ok(None);
        };

        Ok(content.lines().next().and_then(parse_version))
    }

    async fn write_cached(&self, version: &Version) -> io::Result<()> {
        if self.cache_ttl.is_none() {
            return Ok(());
        }

        if let Some(parent) = self.cache_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.cache_file, format!("{}\n", version)).await
    }
}

/// Parses a release tag such as `v0.145.0`.
fn parse_tag(tag: &str) -> Result<Version> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        return Err(HugoError::version_lookup(
            "Latest release metadata does not contain a valid version name",
        ));
    }

    parse_version(trimmed).ok_or_else(|| {
        HugoError::version_lookup(format!(
            "Latest release tag '{}' is not a valid semantic version",
            trimmed
        ))
    })
}

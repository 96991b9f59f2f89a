//! Settings for provisioning and running hugo.
//!
//! Settings are read from a JSON file. Every field has a default, so a
//! partial file (or no file at all) is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HugoError, Result};
use crate::installer::DownloadPolicy;
use crate::paths::CacheLayout;
use crate::version::{VersionRequest, DEFAULT_LATEST_CACHE_TTL, LATEST};

// =============================================================================
// Settings
// =============================================================================

/// Caller-facing knobs, persisted as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Requested hugo version: a semantic version or "latest".
    pub version: String,

    /// Whether hugo may be downloaded.
    pub download: DownloadPolicy,

    /// Directory hugo runs in. Defaults to the current directory.
    pub working_directory: Option<PathBuf>,

    /// Forwarded as `--environment <env>`.
    pub environment: Option<String>,

    /// Appended verbatim to every invocation.
    pub additional_arguments: Vec<String>,

    /// Seconds a resolved "latest" version is reused; 0 disables the cache.
    pub latest_version_cache_ttl_secs: u64,

    /// Overrides `<cache root>/latest_version`.
    pub latest_version_cache_file: Option<PathBuf>,

    /// Overrides the `<temp>/hugo_cache` root.
    pub cache_root: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: LATEST.to_string(),
            download: DownloadPolicy::default(),
            working_directory: None,
            environment: None,
            additional_arguments: Vec::new(),
            latest_version_cache_ttl_secs: DEFAULT_LATEST_CACHE_TTL.as_secs(),
            latest_version_cache_file: None,
            cache_root: None,
        }
    }
}

impl Settings {
    /// Loads settings from a JSON file.
    ///
    /// A missing file yields defaults; a file that exists but cannot be read
    /// or parsed is a configuration error.
    pub fn load(path: &Path) -> Result<Self> {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No settings file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(HugoError::configuration(format!(
                    "Cannot read settings from {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let mut settings: Settings = serde_json::from_str(&json).map_err(|e| {
            HugoError::configuration(format!("Invalid settings in {}: {}", path.display(), e))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Saves settings as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            HugoError::configuration(format!("Cannot serialize settings: {}", e))
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                HugoError::configuration(format!("Cannot create {}: {}", parent.display(), e))
            })?;
        }

        std::fs::write(path, json).map_err(|e| {
            HugoError::configuration(format!("Cannot write settings to {}: {}", path.display(), e))
        })
    }

    /// Normalizes blanks and checks the requested version.
    pub fn validate(&mut self) -> Result<()> {
        self.version = self.version.trim().to_string();
        if self.version.is_empty() {
            self.version = LATEST.to_string();
        }

        self.environment = self
            .environment
            .take()
            .map(|env| env.trim().to_string())
            .filter(|env| !env.is_empty());

        self.version_request().map(|_| ())
    }

    pub fn version_request(&self) -> Result<VersionRequest> {
        VersionRequest::parse(&self.version)
    }

    /// TTL of the "latest" cache; zero means disabled.
    pub fn latest_version_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.latest_version_cache_ttl_secs)
    }

    pub fn cache_layout(&self) -> CacheLayout {
        match &self.cache_root {
            Some(root) => CacheLayout::new(root),
            None => CacheLayout::default(),
        }
    }

    pub fn latest_version_cache_file(&self) -> PathBuf {
        self.latest_version_cache_file
            .clone()
            .unwrap_or_else(|| self.cache_layout().latest_version_file())
    }

    /// Working directory, falling back to the process' current directory.
    pub fn working_directory(&self) -> Result<PathBuf> {
        match &self.working_directory {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir().map_err(|e| {
                HugoError::configuration(format!("Cannot determine current directory: {}", e))
            }),
        }
    }
}

//! Host platform detection and the hugo release platform table.
//!
//! - `architecture`: raw architecture name → canonical [`Architecture`]
//! - `registry`: [`Platform`] descriptors, naming history and download URLs
//!
//! The host is passed around as an explicit [`HostInfo`] value so tests can
//! simulate any operating system and architecture.

mod architecture;
mod registry;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use architecture::Architecture;
pub use registry::{
    DownloadRequest, Platform, PlatformRegistry, VersionDescriptor, PLATFORMS,
    RELEASE_DOWNLOAD_BASE,
};

// ============================================================================
// Operating System
// ============================================================================

/// Operating systems hugo publishes release artifacts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingSystem {
    Windows,
    Linux,
    MacOs,
}

impl OperatingSystem {
    /// Classifies a raw operating system name by case-insensitive prefix.
    ///
    /// `darwin` is accepted for macOS alongside `mac*` (which covers both
    /// `macos` and `Mac OS X`).
    pub fn classify(raw: &str) -> Option<Self> {
        let lower = raw.trim().to_lowercase();
        if lower.starts_with("windows") {
            Some(Self::Windows)
        } else if lower.starts_with("linux") {
            Some(Self::Linux)
        } else if lower.starts_with("mac") || lower.starts_with("darwin") {
            Some(Self::MacOs)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Linux => "linux",
            Self::MacOs => "macos",
        }
    }
}

impl fmt::Display for OperatingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Host Info
// ============================================================================

/// Raw operating system and architecture names of a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    pub os: String,
    pub arch: String,
}

impl HostInfo {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// The host this process was compiled for.
    pub fn current() -> Self {
        Self::new(std::env::consts::OS, std::env::consts::ARCH)
    }
}

impl fmt::Display for HostInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

//! hugorun Core Library
//!
//! This crate provisions and runs a versioned hugo executable. It includes:
//!
//! - Host architecture detection and the release platform table
//! - "latest" version resolution with an on-disk TTL cache
//! - Idempotent download, extraction and atomic install of the executable
//! - Supervised execution with concurrent draining of stdout/stderr
//! - Settings and argument assembly for site builds

pub mod archive;
pub mod config;
pub mod error;
pub mod hugo;
pub mod installer;
pub mod paths;
pub mod platform;
pub mod runner;
pub mod source;
pub mod version;

// Re-exports for convenience
pub use config::Settings;
pub use error::{HugoError, Result};

// Re-export provisioning
pub use archive::Packaging;
pub use installer::{DownloadPolicy, Installer};
pub use paths::CacheLayout;
pub use platform::{
    Architecture, DownloadRequest, HostInfo, OperatingSystem, Platform, PlatformRegistry,
    VersionDescriptor,
};
pub use source::{GithubReleases, ReleaseSource};
pub use version::{VersionRequest, VersionResolver};

// Re-export execution
pub use hugo::{Hugo, Invocation};
pub use runner::{BuildLog, ProcessRunner, TracingLog};

// Re-export semver so callers share the same Version type
pub use semver::Version;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

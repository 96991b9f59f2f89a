//! Cache layout under the OS temp directory.
//!
//! Installed executables and the cached "latest" version live in
//! `hugo_cache` below the temp folder:
//!
//! - Linux: `/tmp/hugo_cache/`
//! - macOS: `/var/folders/.../hugo_cache/` (per-user temp via std::env::temp_dir)
//! - Windows: `C:\Users\<User>\AppData\Local\Temp\hugo_cache\`
//!
//! ```text
//! hugo_cache/
//! ├── latest_version
//! └── bin/
//!     └── linux-amd64-0.145.0/
//!         └── hugo
//! ```

use std::path::{Path, PathBuf};

use semver::Version;

use crate::platform::Platform;

/// Subdirectory name under the OS temp folder.
const CACHE_DIR_NAME: &str = "hugo_cache";

/// Prefix of per-attempt download buffers and partial installs written next
/// to the real executable.
pub const PARTIAL_PREFIX: &str = "~";

/// Directory layout of the hugo cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLayout {
    root: PathBuf,
}

impl Default for CacheLayout {
    fn default() -> Self {
        Self::new(std::env::temp_dir().join(CACHE_DIR_NAME))
    }
}

impl CacheLayout {
    /// Creates a layout rooted at `root` (the `hugo_cache` directory itself).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path: `{root}/bin/`
    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    /// Path: `{root}/latest_version`
    pub fn latest_version_file(&self) -> PathBuf {
        self.root.join("latest_version")
    }

    /// Path: `{root}/bin/{platform}-{version}/`
    pub fn install_dir(&self, platform: &Platform, version: &Version) -> PathBuf {
        self.bin_dir().join(format!("{}-{}", platform.id(), version))
    }

    /// Path: `{root}/bin/{platform}-{version}/hugo[.exe]`
    pub fn executable(&self, platform: &Platform, version: &Version) -> PathBuf {
        self.install_dir(platform, version)
            .join(platform.executable_file_name())
    }
}

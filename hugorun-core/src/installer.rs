//! Idempotent provisioning of the hugo executable.
//!
//! The installer owns the path from "platform + version" to "executable file
//! on disk": it decides whether a download is needed, buffers the archive to
//! a file, extracts the single executable to a `~`-prefixed sibling and
//! renames it into place. A crash at any point leaves at most the sibling
//! behind, never a truncated executable at the canonical path.
//!
//! Buffer and sibling are unique per attempt, so installs racing on the same
//! platform and version never share a file; the last rename wins.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::archive::{extract_file, is_executable, make_executable};
use crate::error::{HugoError, Result};
use crate::paths::{CacheLayout, PARTIAL_PREFIX};
use crate::platform::Platform;
use crate::source::ReleaseSource;

// ============================================================================
// Download Policy
// ============================================================================

/// Whether provisioning may, must or must not fetch a fresh artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DownloadPolicy {
    /// Fail unless the executable is already installed.
    Never,
    /// Reuse an existing install, download only when missing.
    #[default]
    OnDemand,
    /// Download and replace even when an install exists.
    Always,
}

impl DownloadPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Never => "never",
            Self::OnDemand => "on-demand",
            Self::Always => "always",
        }
    }
}

impl fmt::Display for DownloadPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DownloadPolicy {
    type Err = HugoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "never" => Ok(Self::Never),
            "on-demand" | "ondemand" => Ok(Self::OnDemand),
            "always" => Ok(Self::Always),
            other => Err(HugoError::configuration(format!(
                "Unknown download policy '{}' (expected never, on-demand or always)",
                other
            ))),
        }
    }
}

// ============================================================================
// Installer
// ============================================================================

/// Downloads, extracts and installs hugo into a [`CacheLayout`].
#[derive(Clone)]
pub struct Installer {
    layout: CacheLayout,
    source: Arc<dyn ReleaseSource>,
}

impl fmt::Debug for Installer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Installer")
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl Installer {
    pub fn new(layout: CacheLayout, source: Arc<dyn ReleaseSource>) -> Self {
        Self { layout, source }
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    /// Returns the path of a ready-to-run executable for `platform` and
    /// `version`, downloading it first if `policy` requires.
    pub async fn ensure_installed(
        &self,
        platform: &Platform,
        version: &Version,
        policy: DownloadPolicy,
    ) -> Result<PathBuf> {
        let target = self.layout.executable(platform, version);

        if policy != DownloadPolicy::Always && is_executable(&target) {
            debug!("hugo {} already installed at {}", version, target.display());
            return Ok(target);
        }

        if policy == DownloadPolicy::Never {
            return Err(HugoError::NotAvailable { path: target });
        }

        let request = platform.download_request(version).ok_or_else(|| {
            HugoError::download(format!(
                "No binary available for combination of version {} and platform {}",
                version, platform
            ))
        })?;

        info!(
            "Installing hugo {} for {} from {}",
            version, platform, request.url
        );

        let install_dir = self.layout.install_dir(platform, version);
        tokio::fs::create_dir_all(&install_dir).await.map_err(|e| {
            HugoError::download_caused(
                format!("Cannot create directory {}", install_dir.display()),
                e,
            )
        })?;

        let buffer = tempfile::Builder::new()
            .prefix(PARTIAL_PREFIX)
            .suffix(&format!("-{}", request.file_name))
            .tempfile_in(&install_dir)
            .map_err(|e| {
                HugoError::download_caused(
                    format!("Cannot create download buffer in {}", install_dir.display()),
                    e,
                )
            })?;
        let buffer_path = buffer.path().to_path_buf();

        let result = self
            .download_and_install(platform, &request.url, &buffer_path, &install_dir, &target)
            .await;

        if let Err(e) = buffer.close() {
            warn!("Failed to clean up {}: {}", buffer_path.display(), e);
        }

        result?;
        info!("hugo {} installed at {}", version, target.display());
        Ok(target)
    }

    async fn download_and_install(
        &self,
        platform: &Platform,
        url: &str,
        buffer: &Path,
        install_dir: &Path,
        target: &Path,
    ) -> Result<()> {
        let bytes = self.source.download(url, buffer).await?;
        debug!("Buffered {} bytes at {}", bytes, buffer.display());

        let file_name = platform.executable_file_name();
        let partial = tempfile::Builder::new()
            .prefix(&format!("{}{}", PARTIAL_PREFIX, file_name))
            .tempfile_in(install_dir)
            .map_err(|e| {
                HugoError::download_caused(
                    format!("Cannot create partial install in {}", install_dir.display()),
                    e,
                )
            })?;
        let partial_path = partial.path().to_path_buf();

        extract_file(buffer, platform.packaging(), &file_name, &partial_path)?;
        make_executable(&partial_path)?;

        partial.persist(target).map_err(|e| {
            HugoError::download_caused(
                format!(
                    "Cannot move {} to {}",
                    partial_path.display(),
                    target.display()
                ),
                e.error,
            )
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Architecture, PlatformRegistry};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::io::AsyncWriteExt;

    /// Gzip tarball containing `hugo_<n>/HUGO` with a script body.
    fn tarball(n: usize) -> Vec<u8> {
        let body = format!("#!/bin/sh\necho build {}\n", n);

        let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, format!("hugo_{}/HUGO", n), body.as_bytes())
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap()
    }

    /// Serves a fresh tarball per download. With `pause` set, the archive is
    /// written in two halves with a sleep in between so concurrent
    /// downloads interleave their writes.
    struct TarballSource {
        downloads: AtomicUsize,
        pause: Option<Duration>,
    }

    impl TarballSource {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                downloads: AtomicUsize::new(0),
                pause: None,
            })
        }

        fn slow(pause: Duration) -> Arc<Self> {
            Arc::new(Self {
                downloads: AtomicUsize::new(0),
                pause: Some(pause),
            })
        }

        fn downloads(&self) -> usize {
            self.downloads.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl ReleaseSource for TarballSource {
        async fn latest_tag(&self) -> Result<String> {
            Ok("v0.145.0".to_string())
        }

        async fn download(&self, _url: &str, dest: &Path) -> Result<u64> {
            let n = self.downloads.fetch_add(1, Ordering::SeqCst) + 1;
            let bytes = tarball(n);

            let mut file = tokio::fs::File::create(dest).await.unwrap();
            match self.pause {
                Some(pause) => {
                    let (head, tail) = bytes.split_at(bytes.len() / 2);
                    file.write_all(head).await.unwrap();
                    file.flush().await.unwrap();
                    tokio::time::sleep(pause).await;
                    file.write_all(tail).await.unwrap();
                }
                None => file.write_all(&bytes).await.unwrap(),
            }
            file.flush().await.unwrap();

            Ok(bytes.len() as u64)
        }
    }

    /// Names of per-attempt buffers and partial installs left in `dir`.
    fn partial_files(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(PARTIAL_PREFIX))
            .collect()
    }

    struct FailingSource;

    #[async_trait::async_trait]
    impl ReleaseSource for FailingSource {
        async fn latest_tag(&self) -> Result<String> {
            Err(HugoError::version_lookup("offline"))
        }

        async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
            std::fs::write(dest, b"partial").unwrap();
            Err(HugoError::download(format!("connection reset fetching {}", url)))
        }
    }

    fn linux_amd64() -> &'static Platform {
        PlatformRegistry::default()
            .resolve(Architecture::Amd64, "linux")
            .unwrap()
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("never".parse::<DownloadPolicy>().unwrap(), DownloadPolicy::Never);
        assert_eq!("On-Demand".parse::<DownloadPolicy>().unwrap(), DownloadPolicy::OnDemand);
        assert_eq!("on_demand".parse::<DownloadPolicy>().unwrap(), DownloadPolicy::OnDemand);
        assert_eq!("ALWAYS".parse::<DownloadPolicy>().unwrap(), DownloadPolicy::Always);
        assert!("sometimes".parse::<DownloadPolicy>().is_err());
        assert_eq!(DownloadPolicy::default(), DownloadPolicy::OnDemand);
    }

    #[test]
    fn test_policy_serde() {
        let json = serde_json::to_string(&DownloadPolicy::OnDemand).unwrap();
        assert_eq!(json, "\"on-demand\"");
        let policy: DownloadPolicy = serde_json::from_str("\"always\"").unwrap();
        assert_eq!(policy, DownloadPolicy::Always);
    }

    #[tokio::test]
    async fn test_on_demand_downloads_once() {
        let temp_dir = TempDir::new().unwrap();
        let source = TarballSource::new();
        let installer = Installer::new(CacheLayout::new(temp_dir.path()), source.clone());
        let version = Version::new(0, 145, 0);

        let first = installer
            .ensure_installed(linux_amd64(), &version, DownloadPolicy::OnDemand)
            .await
            .unwrap();
        let second = installer
            .ensure_installed(linux_amd64(), &version, DownloadPolicy::OnDemand)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(source.downloads(), 1);
        assert_eq!(
            std::fs::read_to_string(&first).unwrap(),
            "#!/bin/sh\necho build 1\n"
        );
        assert!(is_executable(&first));
        assert!(partial_files(first.parent().unwrap()).is_empty());
    }

    #[tokio::test]
    async fn test_always_replaces_existing_install() {
        let temp_dir = TempDir::new().unwrap();
        let source = TarballSource::new();
        let installer = Installer::new(CacheLayout::new(temp_dir.path()), source.clone());
        let version = Version::new(0, 145, 0);

        let first = installer
            .ensure_installed(linux_amd64(), &version, DownloadPolicy::OnDemand)
            .await
            .unwrap();
        let forced = installer
            .ensure_installed(linux_amd64(), &version, DownloadPolicy::Always)
            .await
            .unwrap();

        assert_eq!(first, forced);
        assert_eq!(source.downloads(), 2);
        assert!(std::fs::read_to_string(&forced).unwrap().contains("build 2"));
        assert!(is_executable(&forced));
    }

    #[tokio::test]
    async fn test_never_without_install_is_not_available() {
        let temp_dir = TempDir::new().unwrap();
        let source = TarballSource::new();
        let installer = Installer::new(CacheLayout::new(temp_dir.path()), source.clone());

        let err = installer
            .ensure_installed(linux_amd64(), &Version::new(0, 145, 0), DownloadPolicy::Never)
            .await
            .unwrap_err();

        assert!(matches!(err, HugoError::NotAvailable { .. }));
        assert_eq!(source.downloads(), 0);
    }

    #[tokio::test]
    async fn test_never_with_install_reuses_it() {
        let temp_dir = TempDir::new().unwrap();
        let source = TarballSource::new();
        let installer = Installer::new(CacheLayout::new(temp_dir.path()), source.clone());
        let version = Version::new(0, 145, 0);

        installer
            .ensure_installed(linux_amd64(), &version, DownloadPolicy::OnDemand)
            .await
            .unwrap();
        let path = installer
            .ensure_installed(linux_amd64(), &version, DownloadPolicy::Never)
            .await
            .unwrap();

        assert!(path.exists());
        assert_eq!(source.downloads(), 1);
    }

    #[tokio::test]
    async fn test_version_without_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let source = TarballSource::new();
        let installer = Installer::new(CacheLayout::new(temp_dir.path()), source.clone());

        let err = installer
            .ensure_installed(linux_amd64(), &Version::new(0, 10, 0), DownloadPolicy::OnDemand)
            .await
            .unwrap_err();

        assert!(matches!(err, HugoError::Download { .. }));
        assert!(err.to_string().contains("No binary available"));
        assert_eq!(source.downloads(), 0);
    }

    #[tokio::test]
    async fn test_failed_download_leaves_nothing_installed() {
        let temp_dir = TempDir::new().unwrap();
        let layout = CacheLayout::new(temp_dir.path());
        let installer = Installer::new(layout.clone(), Arc::new(FailingSource));
        let version = Version::new(0, 145, 0);

        let err = installer
            .ensure_installed(linux_amd64(), &version, DownloadPolicy::OnDemand)
            .await
            .unwrap_err();

        assert!(matches!(err, HugoError::Download { .. }));
        let target = layout.executable(linux_amd64(), &version);
        assert!(!target.exists());

        let leftovers: Vec<_> = std::fs::read_dir(layout.install_dir(linux_amd64(), &version))
            .unwrap()
            .collect();
        assert!(leftovers.is_empty(), "buffer not cleaned up: {:?}", leftovers);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_installs_do_not_share_files() {
        let temp_dir = TempDir::new().unwrap();
        let layout = CacheLayout::new(temp_dir.path());
        let source = TarballSource::slow(Duration::from_millis(50));
        let version = Version::new(0, 145, 0);

        let racers: Vec<_> = (0..2)
            .map(|_| {
                let installer = Installer::new(layout.clone(), source.clone());
                let version = version.clone();
                tokio::spawn(async move {
                    installer
                        .ensure_installed(linux_amd64(), &version, DownloadPolicy::Always)
                        .await
                })
            })
            .collect();

        let mut installed = Vec::new();
        for racer in racers {
            installed.push(racer.await.unwrap().unwrap());
        }

        let target = layout.executable(linux_amd64(), &version);
        assert_eq!(installed, vec![target.clone(), target.clone()]);
        assert_eq!(source.downloads(), 2);

        let body = std::fs::read_to_string(&target).unwrap();
        assert!(
            body == "#!/bin/sh\necho build 1\n" || body == "#!/bin/sh\necho build 2\n",
            "unexpected install: {:?}",
            body
        );
        assert!(is_executable(&target));
        assert!(partial_files(&layout.install_dir(linux_amd64(), &version)).is_empty());
    }
}

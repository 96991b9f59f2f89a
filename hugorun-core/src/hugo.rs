//! High-level entry point: "run hugo version X with these arguments".
//!
//! [`Hugo`] ties together platform detection, version resolution, the
//! installer and the process runner. [`Invocation`] assembles the argument
//! list of a site build.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use semver::Version;
use tracing::info;

use crate::config::Settings;
use crate::error::{HugoError, Result};
use crate::installer::{DownloadPolicy, Installer};
use crate::platform::{HostInfo, Platform, PlatformRegistry};
use crate::runner::{BuildLog, ProcessRunner};
use crate::source::ReleaseSource;
use crate::version::VersionResolver;

// ============================================================================
// Hugo
// ============================================================================

/// A hugo executable of a concrete version on a concrete platform.
#[derive(Debug, Clone)]
pub struct Hugo {
    platform: &'static Platform,
    version: Version,
    policy: DownloadPolicy,
    installer: Installer,
    runner: ProcessRunner,
}

impl Hugo {
    pub fn new(
        platform: &'static Platform,
        version: Version,
        policy: DownloadPolicy,
        installer: Installer,
        runner: ProcessRunner,
    ) -> Self {
        Self {
            platform,
            version,
            policy,
            installer,
            runner,
        }
    }

    /// Builds a `Hugo` for `host` from settings, resolving "latest" if needed.
    ///
    /// Unsupported hosts and invalid versions fail before any network access.
    pub async fn from_settings(
        settings: &Settings,
        host: &HostInfo,
        source: Arc<dyn ReleaseSource>,
        log: Arc<dyn BuildLog>,
    ) -> Result<Self> {
        let platform = PlatformRegistry::default().for_host(host)?;
        let request = settings.version_request()?;

        let resolver = VersionResolver::new(source.clone(), settings.latest_version_cache_file())
            .with_cache_ttl(settings.latest_version_cache_ttl());
        let version = resolver.resolve_version(&request).await?;

        info!(
            "Using hugo {} for {} (requested: {})",
            version, platform, request
        );

        Ok(Self::new(
            platform,
            version,
            settings.download,
            Installer::new(settings.cache_layout(), source),
            ProcessRunner::new(log),
        ))
    }

    pub fn platform(&self) -> &'static Platform {
        self.platform
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn policy(&self) -> DownloadPolicy {
        self.policy
    }

    /// Path of the installed executable, provisioning it per the policy.
    pub async fn executable(&self) -> Result<PathBuf> {
        self.installer
            .ensure_installed(self.platform, &self.version, self.policy)
            .await
    }

    /// Runs hugo with `args` in `working_dir`.
    pub async fn execute(&self, args: &[String], working_dir: &Path) -> Result<()> {
        let executable = self.executable().await?;
        self.runner.execute(&executable, args, working_dir).await
    }
}

impl fmt::Display for Hugo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hugo {} ({})", self.version, self.platform)
    }
}

// ============================================================================
// Invocation
// ============================================================================

/// Argument list of a site build.
///
/// Order: config, destination, environment, then extra arguments verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    config: Option<PathBuf>,
    destination: Option<PathBuf>,
    environment: Option<String>,
    extra: Vec<String>,
}

impl Invocation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from the environment and additional arguments of `settings`.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            environment: settings.environment.clone(),
            extra: settings.additional_arguments.clone(),
            ..Self::default()
        }
    }

    /// A configuration file (`--config`) or directory (`--configDir`).
    pub fn config(mut self, path: impl Into<PathBuf>) -> Self {
        self.config = Some(path.into());
        self
    }

    pub fn destination(mut self, path: impl Into<PathBuf>) -> Self {
        self.destination = Some(path.into());
        self
    }

    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.extra.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra.extend(args.into_iter().map(Into::into));
        self
    }

    /// Assembles the arguments, checking that the configuration exists.
    pub fn build(&self) -> Result<Vec<String>> {
        let mut args = Vec::new();

        if let Some(config) = &self.config {
            let flag = if config.is_dir() {
                "--configDir"
            } else if config.is_file() {
                "--config"
            } else if config.exists() {
                return Err(HugoError::configuration(format!(
                    "Hugo configuration {} is neither a directory nor a regular file",
                    config.display()
                )));
            } else {
                return Err(HugoError::configuration(format!(
                    "Hugo configuration {} does not exist",
                    config.display()
                )));
            };
            args.push(flag.to_string());
            args.push(config.to_string_lossy().into_owned());
        }

        if let Some(destination) = &self.destination {
            args.push("--destination".to_string());
            args.push(destination.to_string_lossy().into_owned());
        }

        if let Some(environment) = &self.environment {
            args.push("--environment".to_string());
            args.push(environment.clone());
        }

        args.extend(self.extra.iter().cloned());
        Ok(args)
    }
}

//! Platform descriptors and the release naming history.
//!
//! Hugo's release artifacts changed their naming scheme and capability set
//! across releases. Each [`Platform`] carries a sorted list of
//! [`VersionDescriptor`]s; the effective naming for a version is the fold of
//! every descriptor whose `since` version is not greater than the requested
//! one, later entries overriding earlier ones field by field.

use std::fmt;

use semver::Version;

use super::{Architecture, HostInfo, OperatingSystem};
use crate::archive::Packaging;
use crate::error::{HugoError, Result};

/// Base URL for release downloads, followed by `v<version>/<file name>`.
pub const RELEASE_DOWNLOAD_BASE: &str = "https://github.com/gohugoio/hugo/releases/download";

// ============================================================================
// Version Descriptors
// ============================================================================

/// A naming/capability rule effective from `since` onwards.
///
/// `None` fields inherit the value of the previous descriptor. A
/// discontinued descriptor marks the first version without any artifact for
/// the platform; it is not inherited, so a later descriptor can resume it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionDescriptor {
    since: (u64, u64, u64),
    platform_suffix: Option<&'static str>,
    extended: Option<bool>,
    discontinued: bool,
}

impl VersionDescriptor {
    pub const fn new(
        since: (u64, u64, u64),
        platform_suffix: Option<&'static str>,
        extended: Option<bool>,
    ) -> Self {
        Self {
            since,
            platform_suffix,
            extended,
            discontinued: false,
        }
    }

    /// Descriptor from which no artifact is published anymore.
    pub const fn discontinued(since: (u64, u64, u64)) -> Self {
        Self {
            since,
            platform_suffix: None,
            extended: None,
            discontinued: true,
        }
    }

    /// Descriptor that only changes the artifact name suffix.
    pub const fn suffix(since: (u64, u64, u64), platform_suffix: &'static str) -> Self {
        Self::new(since, Some(platform_suffix), None)
    }

    pub fn since(&self) -> Version {
        let (major, minor, patch) = self.since;
        Version::new(major, minor, patch)
    }

    pub fn is_discontinued(&self) -> bool {
        self.discontinued
    }
}

/// Result of folding the descriptors that apply to one version.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Effective {
    platform_suffix: Option<&'static str>,
    extended: Option<bool>,
    discontinued: bool,
}

// ============================================================================
// Platform
// ============================================================================

/// One operating system × architecture combination with its naming history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    id: &'static str,
    os: OperatingSystem,
    architecture: Architecture,
    packaging: Packaging,
    executable_suffix: Option<&'static str>,
    descriptors: &'static [VersionDescriptor],
}

impl Platform {
    pub const fn new(
        id: &'static str,
        os: OperatingSystem,
        architecture: Architecture,
        packaging: Packaging,
        executable_suffix: Option<&'static str>,
        descriptors: &'static [VersionDescriptor],
    ) -> Self {
        Self {
            id,
            os,
            architecture,
            packaging,
            executable_suffix,
            descriptors,
        }
    }

    /// Stable identifier, used in cache paths.
    pub fn id(&self) -> &'static str {
        self.id
    }

    pub fn os(&self) -> OperatingSystem {
        self.os
    }

    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    pub fn packaging(&self) -> Packaging {
        self.packaging
    }

    pub fn executable_suffix(&self) -> Option<&'static str> {
        self.executable_suffix
    }

    pub fn descriptors(&self) -> &'static [VersionDescriptor] {
        self.descriptors
    }

    /// File name of the hugo executable on this platform (`hugo` or `hugo.exe`).
    pub fn executable_file_name(&self) -> String {
        format!("hugo{}", self.executable_suffix.unwrap_or(""))
    }

    fn effective(&self, version: &Version) -> Option<Effective> {
        self.descriptors
            .iter()
            .filter(|descriptor| descriptor.since() <= *version)
            .fold(None, |acc: Option<Effective>, descriptor| {
                let previous = acc.unwrap_or_default();
                Some(Effective {
                    platform_suffix: descriptor.platform_suffix.or(previous.platform_suffix),
                    extended: descriptor.extended.or(previous.extended),
                    discontinued: descriptor.discontinued,
                })
            })
            .filter(|effective| !effective.discontinued)
    }

    /// Artifact name suffix for `version`, or `None` if no artifact is
    /// published for this platform at that version.
    pub fn platform_suffix(&self, version: &Version) -> Option<&'static str> {
        self.effective(version)?.platform_suffix
    }

    /// Whether an "extended" build is published for `version`.
    pub fn extended_supported(&self, version: &Version) -> bool {
        self.effective(version)
            .and_then(|effective| effective.extended)
            .unwrap_or(false)
    }

    /// Computes the artifact file name and URL for `version`.
    pub fn download_request(&self, version: &Version) -> Option<DownloadRequest> {
        let suffix = self.platform_suffix(version)?;
        let extended = if self.extended_supported(version) {
            "extended_"
        } else {
            ""
        };

        let file_name = format!(
            "hugo_{}{}_{}{}",
            extended,
            version,
            suffix,
            self.packaging.extension()
        );
        let url = format!("{}/v{}/{}", RELEASE_DOWNLOAD_BASE, version, file_name);

        Some(DownloadRequest { file_name, url })
    }

    /// Download URL for `version`, if an artifact exists.
    pub fn download_url(&self, version: &Version) -> Option<String> {
        self.download_request(version).map(|request| request.url)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Artifact coordinates derived from a platform and version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub file_name: String,
    pub url: String,
}

// ============================================================================
// Built-in Platform Table
// ============================================================================

const V0_54: (u64, u64, u64) = (0, 54, 0);
// darwin/386 went away with the move to Go 1.15.
const V0_75: (u64, u64, u64) = (0, 75, 0);
const V0_94: (u64, u64, u64) = (0, 94, 0);
const V0_102: (u64, u64, u64) = (0, 102, 0);
const V0_103: (u64, u64, u64) = (0, 103, 0);

const LINUX_X86: &[VersionDescriptor] = &[
    VersionDescriptor::new(V0_54, Some("Linux-32bit"), Some(false)),
    VersionDescriptor::suffix(V0_103, "linux-386"),
];
const LINUX_AMD64: &[VersionDescriptor] = &[
    VersionDescriptor::new(V0_54, Some("Linux-64bit"), Some(true)),
    VersionDescriptor::suffix(V0_103, "linux-amd64"),
];
const LINUX_ARM32: &[VersionDescriptor] = &[
    VersionDescriptor::new(V0_54, Some("Linux-ARM"), Some(false)),
    VersionDescriptor::suffix(V0_103, "linux-arm"),
];
const LINUX_ARM64: &[VersionDescriptor] = &[
    VersionDescriptor::new(V0_54, Some("Linux-ARM64"), Some(false)),
    VersionDescriptor::new(V0_102, None, Some(true)),
    VersionDescriptor::suffix(V0_103, "linux-arm64"),
];
const MACOS_X86: &[VersionDescriptor] = &[
    VersionDescriptor::new(V0_54, Some("macOS-32bit"), Some(false)),
    VersionDescriptor::discontinued(V0_75),
];
const MACOS_AMD64: &[VersionDescriptor] = &[
    VersionDescriptor::new(V0_54, Some("macOS-64bit"), Some(true)),
    VersionDescriptor::suffix(V0_103, "darwin-universal"),
];
const MACOS_ARM64: &[VersionDescriptor] = &[
    VersionDescriptor::new(V0_94, Some("macOS-ARM64"), Some(true)),
    VersionDescriptor::suffix(V0_103, "darwin-universal"),
];
const WINDOWS_X86: &[VersionDescriptor] = &[
    VersionDescriptor::new(V0_54, Some("Windows-32bit"), Some(false)),
    VersionDescriptor::suffix(V0_103, "windows-386"),
];
const WINDOWS_AMD64: &[VersionDescriptor] = &[
    VersionDescriptor::new(V0_54, Some("Windows-64bit"), Some(true)),
    VersionDescriptor::suffix(V0_103, "windows-amd64"),
];
const WINDOWS_ARM64: &[VersionDescriptor] = &[
    VersionDescriptor::new(V0_94, Some("Windows-ARM64"), Some(false)),
    VersionDescriptor::suffix(V0_103, "windows-arm64"),
];

/// Every platform hugo publishes release artifacts for.
pub static PLATFORMS: &[Platform] = &[
    Platform::new(
        "linux-x86",
        OperatingSystem::Linux,
        Architecture::X86,
        Packaging::TarGz,
        None,
        LINUX_X86,
    ),
    Platform::new(
        "linux-amd64",
        OperatingSystem::Linux,
        Architecture::Amd64,
        Packaging::TarGz,
        None,
        LINUX_AMD64,
    ),
    Platform::new(
        "linux-arm32",
        OperatingSystem::Linux,
        Architecture::Arm32,
        Packaging::TarGz,
        None,
        LINUX_ARM32,
    ),
    Platform::new(
        "linux-arm64",
        OperatingSystem::Linux,
        Architecture::Arm64,
        Packaging::TarGz,
        None,
        LINUX_ARM64,
    ),
    Platform::new(
        "macos-x86",
        OperatingSystem::MacOs,
        Architecture::X86,
        Packaging::TarGz,
        None,
        MACOS_X86,
    ),
    Platform::new(
        "macos-amd64",
        OperatingSystem::MacOs,
        Architecture::Amd64,
        Packaging::TarGz,
        None,
        MACOS_AMD64,
    ),
    Platform::new(
        "macos-arm64",
        OperatingSystem::MacOs,
        Architecture::Arm64,
        Packaging::TarGz,
        None,
        MACOS_ARM64,
    ),
    Platform::new(
        "windows-x86",
        OperatingSystem::Windows,
        Architecture::X86,
        Packaging::Zip,
        Some(".exe"),
        WINDOWS_X86,
    ),
    Platform::new(
        "windows-amd64",
        OperatingSystem::Windows,
        Architecture::Amd64,
        Packaging::Zip,
        Some(".exe"),
        WINDOWS_AMD64,
    ),
    Platform::new(
        "windows-arm64",
        OperatingSystem::Windows,
        Architecture::Arm64,
        Packaging::Zip,
        Some(".exe"),
        WINDOWS_ARM64,
    ),
];

// ============================================================================
// Registry
// ============================================================================

/// Lookup of platforms by architecture and operating system.
#[derive(Debug, Clone, Copy)]
pub struct PlatformRegistry {
    platforms: &'static [Platform],
}

impl Default for PlatformRegistry {
    fn default() -> Self {
        Self::new(PLATFORMS)
    }
}

impl PlatformRegistry {
    pub fn new(platforms: &'static [Platform]) -> Self {
        Self { platforms }
    }

    pub fn platforms(&self) -> &'static [Platform] {
        self.platforms
    }

    /// Finds the platform for an architecture and a raw operating system name.
    pub fn resolve(&self, architecture: Architecture, os: &str) -> Option<&'static Platform> {
        let os = OperatingSystem::classify(os)?;
        self.platforms
            .iter()
            .find(|platform| platform.architecture == architecture && platform.os == os)
    }

    /// Detects the platform of `host`.
    pub fn for_host(&self, host: &HostInfo) -> Result<&'static Platform> {
        Architecture::detect(&host.arch)
            .and_then(|arch| self.resolve(arch, &host.os))
            .ok_or_else(|| {
                HugoError::configuration(format!(
                    "Unsupported platform/operating-system/architecture: {} {}",
                    host.os, host.arch
                ))
            })
    }
}

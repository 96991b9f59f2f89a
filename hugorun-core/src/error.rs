//! Error taxonomy for provisioning and running Hugo.
//!
//! Every I/O or HTTP failure is wrapped into one of these kinds, with the
//! operation and path/URL in the message, before it leaves a component.

use std::error::Error as StdError;

use thiserror::Error;

type Cause = Box<dyn StdError + Send + Sync + 'static>;

/// Failure kinds surfaced to callers of the core API.
#[derive(Debug, Error)]
pub enum HugoError {
    /// Required input missing or invalid (unsupported platform, bad version, bad settings).
    #[error("{0}")]
    Configuration(String),

    /// The "latest" release metadata was unreachable or unusable.
    #[error("{message}")]
    VersionLookup {
        message: String,
        #[source]
        source: Option<Cause>,
    },

    /// Network failure, missing artifact or archive without the expected entry.
    #[error("{message}")]
    Download {
        message: String,
        #[source]
        source: Option<Cause>,
    },

    /// Download policy forbids fetching and nothing is installed.
    #[error(
        "hugo is not available at {} but download policy is 'never'; expected an already-installed tool",
        .path.display()
    )]
    NotAvailable { path: std::path::PathBuf },

    /// Non-zero exit, spawn failure or interruption of the hugo process.
    #[error("{message}")]
    Execution {
        message: String,
        #[source]
        source: Option<Cause>,
    },
}

impl HugoError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn version_lookup(message: impl Into<String>) -> Self {
        Self::VersionLookup {
            message: message.into(),
            source: None,
        }
    }

    pub fn version_lookup_caused(
        message: impl Into<String>,
        source: impl Into<Cause>,
    ) -> Self {
        Self::VersionLookup {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn download(message: impl Into<String>) -> Self {
        Self::Download {
            message: message.into(),
            source: None,
        }
    }

    pub fn download_caused(message: impl Into<String>, source: impl Into<Cause>) -> Self {
        Self::Download {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
            source: None,
        }
    }

    pub fn execution_caused(message: impl Into<String>, source: impl Into<Cause>) -> Self {
        Self::Execution {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Short name of the failure kind, used by the CLI for reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::VersionLookup { .. } => "version-lookup",
            Self::Download { .. } => "download",
            Self::NotAvailable { .. } => "not-available",
            Self::Execution { .. } => "execution",
        }
    }
}

/// Wraps an `anyhow` chain from the download helpers, keeping its context text.
impl From<anyhow::Error> for HugoError {
    fn from(err: anyhow::Error) -> Self {
        let message = format!("{err:#}");
        Self::download_caused(message, err)
    }
}

pub type Result<T> = std::result::Result<T, HugoError>;

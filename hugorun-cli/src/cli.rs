// CLI module for handling command-line interface

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use hugorun_core::{DownloadPolicy, Settings};

#[derive(Debug, Parser)]
#[command(name = "hugorun")]
#[command(version, about = "Provision a pinned hugo release and run it")]
pub struct Cli {
    /// JSON settings file; missing means defaults
    #[arg(long, global = true, env = "HUGORUN_SETTINGS", default_value = "hugorun.json")]
    pub settings: PathBuf,

    /// Hugo version to use ("latest" or e.g. 0.145.0)
    #[arg(long = "hugo-version", global = true, env = "HUGORUN_VERSION")]
    pub hugo_version: Option<String>,

    /// Download policy: never, on-demand or always
    #[arg(long, global = true, env = "HUGORUN_DOWNLOAD")]
    pub download: Option<DownloadPolicy>,

    /// Directory hugo runs in
    #[arg(long, global = true, env = "HUGORUN_WORKING_DIRECTORY")]
    pub working_directory: Option<PathBuf>,

    /// Hugo environment passed as --environment
    #[arg(long, global = true, env = "HUGORUN_ENVIRONMENT")]
    pub environment: Option<String>,

    /// Seconds to reuse a resolved "latest" version (0 disables the cache)
    #[arg(long, global = true, env = "HUGORUN_CACHE_TTL")]
    pub cache_ttl: Option<u64>,

    /// Root of the download cache (default: <temp>/hugo_cache)
    #[arg(long, global = true, env = "HUGORUN_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// More output (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Resolve the requested hugo version and print it
    Version,
    /// Make sure hugo is installed and print its path
    Install,
    /// Build the site
    Build {
        /// Configuration file or directory
        #[arg(long)]
        config: PathBuf,
        /// Output directory
        #[arg(long)]
        output: PathBuf,
        /// Extra arguments after `--`
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// Run hugo with arbitrary arguments
    Exec {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

impl Cli {
    /// Layers command-line flags over settings loaded from file.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(version) = &self.hugo_version {
            settings.version = version.clone();
        }
        if let Some(download) = self.download {
            settings.download = download;
        }
        if let Some(dir) = &self.working_directory {
            settings.working_directory = Some(dir.clone());
        }
        if let Some(environment) = &self.environment {
            settings.environment = Some(environment.clone());
        }
        if let Some(ttl) = self.cache_ttl {
            settings.latest_version_cache_ttl_secs = ttl;
        }
        if let Some(dir) = &self.cache_dir {
            settings.cache_root = Some(dir.clone());
        }
    }

    /// Default log filter for the verbosity level.
    pub fn log_directives(&self) -> &'static [&'static str] {
        match self.verbose {
            0 => &["hugorun_core=info", "hugorun_cli=info", "hugo=info"],
            1 => &["hugorun_core=debug", "hugorun_cli=debug", "hugo=debug"],
            _ => &["hugorun_core=trace", "hugorun_cli=trace", "hugo=trace"],
        }
    }
}

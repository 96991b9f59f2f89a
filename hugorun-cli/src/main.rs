//! hugorun command line
//!
//! Provisions the requested hugo release for this host and runs it.

mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
use hugorun_core::{
    GithubReleases, HostInfo, Hugo, HugoError, Invocation, ReleaseSource, Settings, TracingLog,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli) {
        eprintln!("Failed to initialize logging: {e:#}");
        return ExitCode::FAILURE;
    }

    tracing::debug!("Starting hugorun v{}", hugorun_core::VERSION);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(kind = failure_kind(&e), "{e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Failure kind of the underlying `HugoError`, looking through added context.
fn failure_kind(err: &anyhow::Error) -> &'static str {
    err.downcast_ref::<HugoError>()
        .map(HugoError::kind)
        .unwrap_or("internal")
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let mut filter = EnvFilter::from_default_env();
    for directive in cli.log_directives() {
        filter = filter.add_directive(directive.parse()?);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut settings = Settings::load(&cli.settings)?;
    cli.apply(&mut settings);
    settings.validate()?;

    let source: Arc<dyn ReleaseSource> = Arc::new(GithubReleases::new()?);
    let hugo = Hugo::from_settings(&settings, &HostInfo::current(), source, Arc::new(TracingLog))
        .await?;

    match cli.command {
        Commands::Version => {
            println!("{}", hugo.version());
        }
        Commands::Install => {
            let executable = hugo.executable().await?;
            println!("{}", executable.display());
        }
        Commands::Build {
            config,
            output,
            args,
        } => {
            let argv = Invocation::from_settings(&settings)
                .config(config)
                .destination(&output)
                .args(args)
                .build()?;
            let working_dir = settings.working_directory()?;

            hugo.execute(&argv, &working_dir)
                .await
                .with_context(|| format!("Building site into {} failed", output.display()))?;
            tracing::info!("Site built into {}", output.display());
        }
        Commands::Exec { args } => {
            let working_dir = settings.working_directory()?;
            hugo.execute(&args, &working_dir).await?;
        }
    }

    Ok(())
}

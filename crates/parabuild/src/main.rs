mod cli;
mod shutdown;

use anyhow::Context;
use clap::Parser;
use cli::Cli;
use parabuild_build::{CancellationToken, Orchestrator, ProcessRunner};
use parabuild_core::{BuildMetadata, is_branch_pipeline};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let branch_pipeline = is_branch_pipeline();
    let plan = cli
        .into_settings()
        .into_plan(branch_pipeline)
        .context("invalid configuration")?;

    let images = plan.images.len();
    let platforms = plan.platform_count();

    let orchestrator = Orchestrator::new(
        plan,
        BuildMetadata::from_env(),
        Arc::new(ProcessRunner::default()),
    );

    let cancel = CancellationToken::new();
    shutdown::watch_signals(cancel.clone());

    let started = Instant::now();
    if let Err(e) = orchestrator.run(cancel.clone()).await {
        error!(error = %e, "Build failed");
        cancel.cancel();
        warn!("Cancel context...");
        tokio::time::sleep(shutdown::GRACE_PERIOD).await;
        std::process::exit(1);
    }

    info!(
        duration = ?Duration::from_secs(started.elapsed().as_secs()),
        images,
        platforms,
        "Finished"
    );
    Ok(())
}

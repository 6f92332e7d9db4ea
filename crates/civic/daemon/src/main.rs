//! Civic Daemon - periodic governance driver
//!
//! Runs the election cycle controller and the orchestration engine against a
//! shared store on fixed intervals, or once with `--once`.

use civic_daemon::error::DaemonError;
use civic_daemon::scheduler::shutdown_signal;
use civic_daemon::{open_storage, DaemonConfig, DaemonResult, PopulationSeed, Scheduler};
use civic_runtime::GovernanceEngine;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Civic Daemon CLI
#[derive(Parser)]
#[command(name = "civicd")]
#[command(about = "Civic Daemon - delegate elections and cell consensus", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CIVIC_CONFIG")]
    config: Option<String>,

    /// Log level (overrides configuration)
    #[arg(long, env = "CIVIC_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "CIVIC_LOG_JSON")]
    json: bool,

    /// JSON population seed for the in-memory store
    #[arg(long)]
    seed: Option<String>,

    /// Run one election tick and one orchestration run, print both reports, exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = DaemonConfig::load(cli.config.as_deref())
        .map_err(|e| DaemonError::Config(e.to_string()))?;

    // Initialize tracing
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    if cli.json || config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let seed = cli
        .seed
        .as_deref()
        .map(PopulationSeed::load)
        .transpose()
        .map_err(|e| DaemonError::Seed(format!("{e:#}")))?;

    let store = open_storage(&config.storage, seed).await?;
    let generator = civic_textgen::build_generator(&config.textgen)?;
    let engine = GovernanceEngine::new(store, generator, config.governance.clone())?
        .with_retry(config.scheduler.retry.policy());
    let scheduler = Scheduler::new(Arc::new(engine), config.scheduler.clone());

    if cli.once {
        let report = scheduler.run_once().await;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        postgres = matches!(config.storage, civic_daemon::config::StorageConfig::Postgres { .. }),
        textgen = ?config.textgen.backend,
        "civicd starting"
    );

    scheduler.run_until(shutdown_signal()).await;
    Ok(())
}

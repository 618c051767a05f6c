//! Survey Client Binary Entry Point
//!
//! Runs the survey client with the built-in collectors until interrupted.
//! Core functionality is provided by the `survey_client` library crate.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use survey_client::{
    HashVersion, ProgramCollector, Registry, SurveyClient, SurveyConfig, config::parse_duration,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Survey Client - periodic statistics submission
#[derive(Parser, Debug)]
#[command(name = "survey-client", version, about, long_about = None)]
struct Cli {
    /// Path to a YAML configuration file (defaults plus environment if absent)
    #[arg(short, long, env = "SURVEYCLIENT_CONFIG")]
    config: Option<String>,

    /// Submission endpoint (overrides config)
    #[arg(long)]
    url: Option<String>,

    /// Wait before the first submission, e.g. `0s` or `1m` (overrides config)
    #[arg(long, value_parser = parse_duration)]
    start_delay: Option<Duration>,

    /// Submit once and exit
    #[arg(long)]
    once: bool,

    /// Skip TLS certificate verification
    #[arg(long)]
    insecure: bool,

    /// Program name to report
    #[arg(long, default_value = "")]
    name: String,

    /// Program version to report
    #[arg(long, default_value = "")]
    version_string: String,

    /// Installation identifier to report (hashed)
    #[arg(long)]
    guid: Option<String>,

    /// Guid hash version (`v1`, or empty for none)
    #[arg(long, env = "SURVEYCLIENT_HASH_GUID", default_value = "v1")]
    hash_guid: HashVersion,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,survey_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Load configuration (CLI > ENV > config file)
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path);
            SurveyConfig::load(path)?
        }
        None => SurveyConfig::default(),
    };
    config.apply_env(|key| std::env::var(key).ok())?;

    if let Some(url) = cli.url {
        config.url = url;
    }
    if let Some(delay) = cli.start_delay {
        config.start_delay = delay;
    }
    if cli.once {
        config.interval = Duration::ZERO;
    }
    if cli.insecure {
        config.insecure = true;
    }

    tracing::info!(
        "Endpoint: {}, start delay: {:?}, interval: {:?}, error delay: {:?}",
        config.url,
        config.start_delay,
        config.interval,
        config.error_delay,
    );

    let registry = Arc::new(Registry::with_defaults());
    let guid = cli.guid.map(|guid| cli.hash_guid.apply(guid.as_bytes()));
    registry.register(ProgramCollector::new(cli.name, cli.version_string, guid))?;

    let client = SurveyClient::new(&config, registry)?;
    let cancel = CancellationToken::new();
    let mut handle = client.start(cancel.clone())?;

    tokio::select! {
        result = &mut handle => {
            result?;
            tracing::info!("Survey loop finished");
        }
        _ = shutdown_signal() => {
            cancel.cancel();
            handle.await?;
            tracing::info!("Shutdown complete");
        }
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }
}

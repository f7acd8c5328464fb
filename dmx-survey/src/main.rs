//! Digital Museum survey service (dmx-survey) - Main entry point
//!
//! Serves the viewing experiment, exhibition builder and exports over HTTP.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dmx_common::config::{ServiceCredentials, SurveyConfig};
use dmx_common::time::SystemClock;
use dmx_common::Catalog;
use dmx_survey::registry::SessionRegistry;
use dmx_survey::services::{HttpImageFetcher, SheetsClient};
use dmx_survey::{build_router, AppState};

/// Command-line arguments for dmx-survey
#[derive(Parser, Debug)]
#[command(name = "dmx-survey")]
#[command(about = "Digital museum viewing survey service")]
#[command(version)]
struct Args {
    /// Config file (overrides DMX_CONFIG and ~/.config/dmx/survey.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, e.g. 0.0.0.0:5730
    #[arg(short, long, env = "DMX_BIND")]
    bind: Option<String>,

    /// Artwork catalog JSON file
    #[arg(long, env = "DMX_CATALOG")]
    catalog: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    let dotenv_path = dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dmx_survey=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run(Args::parse(), dotenv_path).await {
        error!("dmx-survey failed to start: {:#}", e);
        return Err(e);
    }
    Ok(())
}

async fn run(args: Args, dotenv_path: Option<PathBuf>) -> Result<()> {
    info!("Starting dmx-survey v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = dotenv_path {
        info!("Loaded environment from {}", path.display());
    }

    let (mut config, source) =
        SurveyConfig::resolve(args.config.as_deref()).context("Failed to load configuration")?;
    info!("Configuration source: {}", source);

    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(catalog) = args.catalog {
        config.catalog_path = catalog;
    }
    config.validate().context("Invalid configuration")?;

    let catalog = Catalog::load(&config.catalog_path).with_context(|| {
        format!(
            "Failed to load artwork catalog from {}",
            config.catalog_path.display()
        )
    })?;
    if catalog.len() < config.sample_size {
        bail!(
            "Catalog {} has {} artworks; at least {} are needed per session",
            config.catalog_path.display(),
            catalog.len(),
            config.sample_size
        );
    }
    info!(
        artworks = catalog.len(),
        sample_size = config.sample_size,
        "Catalog loaded from {}",
        config.catalog_path.display()
    );

    let credentials =
        ServiceCredentials::load(&config.sheets).context("External log credentials unavailable")?;
    let timeout = Duration::from_secs(config.http_timeout_secs);

    let sheets = SheetsClient::new(config.sheets.clone(), credentials, timeout)
        .context("Failed to initialize spreadsheet client")?;
    let fetcher =
        HttpImageFetcher::new(timeout).context("Failed to initialize image fetcher")?;

    if config.seed.is_some() {
        info!("Session randomness seeded from configuration");
    }
    let registry = SessionRegistry::new(config.sample_size, config.seed)
        .with_ttl(Duration::from_secs(config.session_ttl_secs));

    let state = AppState::new(
        catalog,
        registry,
        Arc::new(SystemClock::new()),
        Arc::new(sheets),
        Arc::new(fetcher),
        config.survey_url.clone(),
    );
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

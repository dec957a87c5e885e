//! bookdash-ui - Bookshop sales dashboard
//!
//! Fetches the book, edition, author and quarterly sales sheets once at
//! startup, builds an immutable merged snapshot and serves the dashboard.

use anyhow::{Context, Result};
use bookdash_common::config::{ConfigResolver, SPREADSHEET_ID_ENV_VAR};
use bookdash_ui::dataset::Loader;
use bookdash_ui::source::HttpFetcher;
use bookdash_ui::{build_router, AppState};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};

/// Command-line arguments for bookdash-ui
#[derive(Parser, Debug)]
#[command(name = "bookdash-ui")]
#[command(about = "Bookshop sales dashboard")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides config file)
    #[arg(short, long, env = "BOOKDASH_PORT")]
    port: Option<u16>,

    /// Enable debug logging
    #[arg(short, long, env = "BOOKDASH_DEBUG")]
    debug: bool,

    /// Path to TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // The log level comes from the config file, so configuration is read
    // before the subscriber is installed
    let (config, config_source) = ConfigResolver::new(args.config.clone())
        .load()
        .context("Failed to load configuration")?;

    let debug = args.debug || config.server.debug;
    let level = if debug { "debug" } else { config.logging.level.as_str() };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("bookdash_ui={level},bookdash_common={level},tower_http={level}").into()),
        )
        .init();

    info!(
        "Starting Bookshop Dashboard (bookdash-ui) v{}",
        env!("CARGO_PKG_VERSION")
    );
    match config_source.path() {
        Some(path) => info!("Configuration: {}", path.display()),
        None => warn!("No configuration file found, using compiled defaults"),
    }
    if config.sources.spreadsheet_id.is_none() {
        warn!(
            "No spreadsheet configured (set sources.spreadsheet_id or {}); dashboard will be empty",
            SPREADSHEET_ID_ENV_VAR
        );
    }

    let fetcher = HttpFetcher::new(Duration::from_secs(config.dashboard.fetch_timeout_secs))
        .context("Failed to create HTTP client")?;
    let loader = Loader::new(
        Arc::new(fetcher),
        config.sources.clone(),
        config.dashboard.rating_seed,
    );

    // Startup blocks until every source has answered or failed
    let dashboard = loader.build().await.context("Failed to build dashboard")?;
    let state = AppState::new(dashboard, loader, &config.dashboard);

    if let Some(secs) = config.dashboard.refresh_interval_secs.filter(|s| *s > 0) {
        let refresh_state = state.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(secs));
            interval.tick().await;
            loop {
                interval.tick().await;
                info!("Periodic refresh");
                // Failure is logged by reload and the old snapshot stays live
                let _ = refresh_state.reload().await;
            }
        });
        info!("Periodic refresh every {}s", secs);
    }

    let app = build_router(state);

    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", config.server.host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.server.host, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("bookdash-ui listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

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
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

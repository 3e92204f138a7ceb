//! vision-web - Cloud Vision gateway
//!
//! Forwards image references to the Cloud Vision API and returns labels,
//! extracted text and localized objects over HTTP.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vision_common::config::{
    default_config_path, load_toml_config, ConfigOverrides, ConfigResolver,
};
use vision_web::vision::CloudVisionClient;
use vision_web::{build_router, AppState};

/// Command-line arguments for vision-web
#[derive(Parser, Debug)]
#[command(name = "vision-web")]
#[command(about = "Cloud Vision gateway: labels, text and objects for image URLs")]
#[command(version)]
struct Args {
    /// Path to TOML config file
    #[arg(short, long, env = "VISION_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on, e.g. 127.0.0.1:5780
    #[arg(short, long)]
    bind: Option<String>,

    /// Cloud Vision API key
    #[arg(long)]
    api_key: Option<String>,

    /// Vision API base URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is resolved before tracing so the log level can come from it;
    // the TOML loader's own messages are replayed below.
    let config_path = args.config.clone().or_else(default_config_path);
    let toml = match &config_path {
        Some(path) => load_toml_config(path).context("Failed to load config file")?,
        None => None,
    };

    let overrides = ConfigOverrides {
        bind_address: args.bind,
        api_key: args.api_key,
        endpoint: args.endpoint,
        log_level: args.log_level,
    };
    let config = ConfigResolver::new(toml.clone())
        .with_overrides(overrides)
        .resolve()
        .context("Invalid configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{level},vision_web={level},tower_http={level}", level = config.log_level)
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting vision-web v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match (&config_path, &toml) {
        (Some(path), Some(_)) => info!("Config file: {}", path.display()),
        (Some(path), None) => warn!("Config file not found at {}, using defaults", path.display()),
        (None, _) => warn!("No config directory on this platform, using defaults"),
    }

    info!("Vision endpoint: {}", config.endpoint);
    if config.api_key.is_none() {
        warn!(
            "Vision API key not configured; analysis requests will fail until one is set.\n\
             Configure using one of:\n\
             1. Command line: --api-key your-key-here\n\
             2. Environment: VISION_API_KEY=your-key-here\n\
             3. TOML config: api_key = \"your-key-here\""
        );
    }

    let client = Arc::new(
        CloudVisionClient::new(&config).context("Failed to create Vision client")?,
    );
    let state = AppState::new(client.clone());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_address))?;
    info!("Listening on http://{}", config.bind_address);
    info!("Health check: http://{}/health", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(client))
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
///
/// In-flight requests are drained by axum; new batch sessions are refused
/// from the moment the signal arrives.
async fn shutdown_signal(client: Arc<CloudVisionClient>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }

    client.close_batches();
}

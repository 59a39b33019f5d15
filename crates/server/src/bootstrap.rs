//! Startup and shutdown steps shared by the service binaries.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use axum::Router;
use boxoffice_core::config::{LoggingConfig, ServerConfig};
use boxoffice_core::{load_config, validate_config, Config, LogFormat, SanitizedConfig};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the config file path
pub const CONFIG_ENV: &str = "BOXOFFICE_CONFIG";

/// Path of the config file, from `BOXOFFICE_CONFIG` or `config.toml`
pub fn config_path() -> PathBuf {
    std::env::var(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"))
}

/// Load and validate the configuration
pub fn load_service_config() -> Result<Config> {
    let config_path = config_path();
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;
    Ok(config)
}

/// Install the global tracing subscriber
pub fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,tower_http=debug".into());

    match logging.format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

/// Log where the configuration came from and what it resolved to
pub fn log_config(service: &str, config: &Config) {
    info!("{} configuration loaded from {:?}", service, config_path());
    match serde_json::to_string(&SanitizedConfig::from(config)) {
        Ok(json) => info!("Configuration: {}", json),
        Err(e) => error!("Failed to serialize configuration: {}", e),
    }
}

/// Bind and serve `app` until Ctrl+C or SIGTERM
pub async fn serve(app: Router, server: &ServerConfig) -> Result<()> {
    let addr = SocketAddr::new(server.host, server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

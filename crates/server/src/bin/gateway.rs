use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use boxoffice_core::{
    create_request_log, FileRequestLog, HttpInventoryClient, InventoryClient, JetStreamQueue,
    MessageQueue, OrderOrchestrator,
};
use boxoffice_server::api::gateway_router;
use boxoffice_server::bootstrap::{init_logging, load_service_config, log_config, serve};
use boxoffice_server::state::GatewayState;

/// Buffer size for the request log channel
const REQUEST_LOG_BUFFER_SIZE: usize = 1000;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        tracing::error!("Fatal error: {:#}", e);
        eprintln!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = load_service_config()?;
    init_logging(&config.logging);
    log_config("Gateway", &config);

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.upstream.timeout_secs))
        .build()
        .context("Failed to build HTTP client")?;

    let inventory: Arc<dyn InventoryClient> = Arc::new(HttpInventoryClient::with_client(
        http.clone(),
        config.upstream.inventory_url.clone(),
    ));
    info!("Inventory service at {}", config.upstream.inventory_url);

    // Connects on first publish, so the gateway starts without the broker
    let queue: Arc<dyn MessageQueue> = Arc::new(JetStreamQueue::new(config.queue.clone()));
    info!("Purchases go to {} on {}", config.queue.subject, config.queue.url);

    let orchestrator = OrderOrchestrator::new(
        config.orchestrator.clone(),
        inventory,
        queue,
        Duration::from_secs(config.queue.publish_timeout_secs),
    );
    if config.orchestrator.compensate_on_publish_failure {
        info!("Stock is restored when a purchase cannot be queued");
    }

    let (request_log, writer_handle) = match config.logging.request_log {
        Some(ref path) => {
            let sink = FileRequestLog::open(path)
                .with_context(|| format!("Failed to open request log {:?}", path))?;
            let (handle, writer) = create_request_log(Arc::new(sink), REQUEST_LOG_BUFFER_SIZE);
            info!("Request log at {:?}", path);
            (Some(handle), Some(tokio::spawn(writer.run())))
        }
        None => (None, None),
    };

    let state = Arc::new(GatewayState::new(
        config.clone(),
        orchestrator,
        http,
        request_log,
    ));

    serve(gateway_router(state), &config.server).await?;

    // The router owned the last request log handle; wait for pending lines
    if let Some(handle) = writer_handle {
        let _ = handle.await;
        info!("Request log writer stopped");
    }

    Ok(())
}

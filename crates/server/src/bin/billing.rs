use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use boxoffice_core::{JetStreamQueue, MessageQueue, OrderConsumer, OrderStore, SqliteOrderStore};
use boxoffice_server::api::billing_router;
use boxoffice_server::bootstrap::{init_logging, load_service_config, log_config, serve};
use boxoffice_server::state::BillingState;

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
    log_config("Billing", &config);

    let store: Arc<dyn OrderStore> = Arc::new(
        SqliteOrderStore::new(&config.database.path).context("Failed to open order store")?,
    );
    info!("Order store initialized at {:?}", config.database.path);

    let consumer = if config.consumer.enabled {
        let queue: Arc<dyn MessageQueue> = Arc::new(JetStreamQueue::new(config.queue.clone()));
        let consumer = Arc::new(OrderConsumer::new(
            config.consumer.clone(),
            queue,
            Arc::clone(&store),
        ));
        consumer.start().await;
        info!(
            "Order consumer started on {} ({})",
            config.queue.subject, config.queue.consumer_name
        );
        Some(consumer)
    } else {
        info!("Order consumer disabled in config");
        None
    };

    let state = Arc::new(BillingState::new(config.clone(), store, consumer.clone()));
    let result = serve(billing_router(state), &config.server).await;

    if let Some(ref consumer) = consumer {
        consumer.stop().await;
    }

    result
}

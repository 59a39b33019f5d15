use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use boxoffice_core::{MovieStore, SqliteMovieStore};
use boxoffice_server::api::inventory_router;
use boxoffice_server::bootstrap::{init_logging, load_service_config, log_config, serve};
use boxoffice_server::state::InventoryState;

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
    log_config("Inventory", &config);

    let store: Arc<dyn MovieStore> = Arc::new(
        SqliteMovieStore::new(&config.database.path).context("Failed to open movie store")?,
    );
    info!("Movie store initialized at {:?}", config.database.path);

    let state = Arc::new(InventoryState::new(config.clone(), store));
    serve(inventory_router(state), &config.server).await
}

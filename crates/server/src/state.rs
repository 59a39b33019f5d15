use std::sync::Arc;

use boxoffice_core::{
    Config, ConsumerStatus, MovieStore, OrderConsumer, OrderOrchestrator, OrderStore,
    RequestLogHandle, SanitizedConfig,
};

/// Shared state for the gateway
pub struct GatewayState {
    config: Config,
    orchestrator: OrderOrchestrator,
    http: reqwest::Client,
    request_log: Option<RequestLogHandle>,
}

impl GatewayState {
    pub fn new(
        config: Config,
        orchestrator: OrderOrchestrator,
        http: reqwest::Client,
        request_log: Option<RequestLogHandle>,
    ) -> Self {
        Self {
            config,
            orchestrator,
            http,
            request_log,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn orchestrator(&self) -> &OrderOrchestrator {
        &self.orchestrator
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn inventory_url(&self) -> &str {
        self.config.upstream.inventory_url.trim_end_matches('/')
    }

    pub fn billing_url(&self) -> &str {
        self.config.upstream.billing_url.trim_end_matches('/')
    }

    /// Append a line to the request log, if one is configured
    pub async fn record_request(&self, endpoint: &str, method: &str, status_code: u16) {
        if let Some(ref log) = self.request_log {
            log.record(endpoint, method, status_code).await;
        }
    }
}

/// Shared state for the inventory service
pub struct InventoryState {
    config: Config,
    store: Arc<dyn MovieStore>,
}

impl InventoryState {
    pub fn new(config: Config, store: Arc<dyn MovieStore>) -> Self {
        Self { config, store }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn store(&self) -> &dyn MovieStore {
        self.store.as_ref()
    }
}

/// Shared state for the billing service
pub struct BillingState {
    config: Config,
    store: Arc<dyn OrderStore>,
    consumer: Option<Arc<OrderConsumer>>,
}

impl BillingState {
    pub fn new(
        config: Config,
        store: Arc<dyn OrderStore>,
        consumer: Option<Arc<OrderConsumer>>,
    ) -> Self {
        Self {
            config,
            store,
            consumer,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn store(&self) -> &dyn OrderStore {
        self.store.as_ref()
    }

    /// Status of the embedded consumer, `None` when it is disabled
    pub fn consumer_status(&self) -> Option<ConsumerStatus> {
        self.consumer.as_ref().map(|c| c.status())
    }
}

//! Common test utilities for API and end-to-end tests.
//!
//! The inventory and billing routers run for real (in-memory SQLite), bound on
//! ephemeral ports so the gateway reaches them over HTTP exactly as in
//! production. Only the broker is replaced, by `MemoryQueue`.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use serde_json::Value;
use tower::ServiceExt;

use boxoffice_core::{
    Config, ConsumerConfig, HttpInventoryClient, InventoryClient, MessageQueue, Movie,
    MovieStore, OrderConsumer, OrderOrchestrator, OrderStore, RequestLogHandle,
    SqliteMovieStore, SqliteOrderStore, testing::MemoryQueue,
};
use boxoffice_server::api::{billing_router, gateway_router, inventory_router};
use boxoffice_server::state::{BillingState, GatewayState, InventoryState};

/// Re-export fixtures for test convenience
pub use boxoffice_core::testing::fixtures;

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Send a request through a router without binding a socket.
pub async fn send(router: &Router, method: &str, path: &str, body: Option<Value>) -> TestResponse {
    let mut request_builder = Request::builder().method(method).uri(path);

    let body = if let Some(json_body) = body {
        request_builder = request_builder.header("Content-Type", "application/json");
        Body::from(serde_json::to_vec(&json_body).unwrap())
    } else {
        Body::empty()
    };

    let request = request_builder.body(body).unwrap();
    collect(router, request).await
}

/// Send a request with a raw body (for malformed JSON).
pub async fn send_raw(router: &Router, method: &str, path: &str, body: &str) -> TestResponse {
    let request = Request::builder()
        .method(method)
        .uri(path)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    collect(router, request).await
}

async fn collect(router: &Router, request: Request<Body>) -> TestResponse {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("Failed to send request");

    let status = response.status();
    let body_bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to collect body")
        .to_bytes();

    let body: Value = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
    };

    TestResponse { status, body }
}

/// Serve a router on 127.0.0.1 with an ephemeral port.
pub async fn spawn_router(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
    addr
}

/// Inventory router over an in-memory store.
pub fn inventory_app() -> (Router, Arc<SqliteMovieStore>) {
    let store = Arc::new(SqliteMovieStore::in_memory().expect("Failed to create movie store"));
    let state = Arc::new(InventoryState::new(
        Config::default(),
        Arc::clone(&store) as Arc<dyn MovieStore>,
    ));
    (inventory_router(state), store)
}

/// Billing router over an in-memory store, without a consumer.
pub fn billing_app() -> (Router, Arc<SqliteOrderStore>) {
    let store = Arc::new(SqliteOrderStore::in_memory().expect("Failed to create order store"));
    let state = Arc::new(BillingState::new(
        Config::default(),
        Arc::clone(&store) as Arc<dyn OrderStore>,
        None,
    ));
    (billing_router(state), store)
}

/// Consumer settings with short delays for tests.
pub fn fast_consumer_config() -> ConsumerConfig {
    ConsumerConfig {
        enabled: true,
        max_deliveries: 3,
        redelivery_delay_ms: 5,
        redelivery_delay_max_ms: 20,
        reconnect_initial_ms: 5,
        reconnect_max_ms: 20,
    }
}

/// Options for the gateway fixture.
#[derive(Default)]
pub struct GatewayOptions {
    /// Restore stock when publishing fails
    pub compensate: bool,
    /// Point the gateway at an address nothing listens on
    pub inventory_down: bool,
    /// Request log handle passed to the gateway state
    pub request_log: Option<RequestLogHandle>,
}

/// Gateway wired to real inventory and billing services plus an in-memory queue.
pub struct GatewayFixture {
    /// The gateway router under test
    pub router: Router,
    /// Backing store of the inventory service
    pub movies: Arc<SqliteMovieStore>,
    /// Backing store of the billing service
    pub orders: Arc<SqliteOrderStore>,
    /// Broker stand-in shared by the gateway and the consumer
    pub queue: MemoryQueue,
}

impl GatewayFixture {
    pub async fn new() -> Self {
        Self::with_options(GatewayOptions::default()).await
    }

    pub async fn with_options(options: GatewayOptions) -> Self {
        let (inventory, movies) = inventory_app();
        let (billing, orders) = billing_app();

        let inventory_url = if options.inventory_down {
            // Bind then drop to get a port nobody listens on
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            let addr = listener.local_addr().unwrap();
            drop(listener);
            format!("http://{}", addr)
        } else {
            format!("http://{}", spawn_router(inventory).await)
        };
        let billing_url = format!("http://{}", spawn_router(billing).await);

        let mut config = Config::default();
        config.upstream.inventory_url = inventory_url.clone();
        config.upstream.billing_url = billing_url;
        config.orchestrator.compensate_on_publish_failure = options.compensate;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        let queue = MemoryQueue::new();
        let orchestrator = OrderOrchestrator::new(
            config.orchestrator.clone(),
            Arc::new(HttpInventoryClient::with_client(http.clone(), inventory_url))
                as Arc<dyn InventoryClient>,
            Arc::new(queue.clone()) as Arc<dyn MessageQueue>,
            Duration::from_secs(1),
        );

        let state = Arc::new(GatewayState::new(
            config,
            orchestrator,
            http,
            options.request_log,
        ));

        Self {
            router: gateway_router(state),
            movies,
            orders,
            queue,
        }
    }

    /// Add a movie straight to the inventory store.
    pub fn add_movie(&self, title: &str, price: Decimal, stock: i64) -> Movie {
        self.movies
            .create(fixtures::new_movie(title, price, stock))
            .expect("Failed to create movie")
    }

    /// Current stock of a movie.
    pub fn stock(&self, movie_id: i64) -> i64 {
        self.movies
            .get(movie_id)
            .unwrap()
            .expect("Movie should exist")
            .stock
    }

    /// Start a consumer that drains the queue into the billing store.
    pub async fn start_consumer(&self) -> Arc<OrderConsumer> {
        let consumer = Arc::new(OrderConsumer::new(
            fast_consumer_config(),
            Arc::new(self.queue.clone()) as Arc<dyn MessageQueue>,
            Arc::clone(&self.orders) as Arc<dyn OrderStore>,
        ));
        consumer.start().await;
        consumer
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        send(&self.router, "GET", path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        send(&self.router, "POST", path, Some(body)).await
    }

    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        send_raw(&self.router, "POST", path, body).await
    }
}

/// Poll until `condition` holds or two seconds pass.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}

//! Remote access to the inventory service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use super::Movie;
use crate::metrics;

/// Errors talking to the inventory service.
#[derive(Debug, Clone, Error)]
pub enum InventoryClientError {
    #[error("Movie not found: {0}")]
    NotFound(i64),

    #[error("Insufficient stock for movie {0}")]
    InsufficientStock(i64),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timeout")]
    Timeout,

    #[error("API error: {0}")]
    ApiError(String),
}

/// Operations the gateway needs from the inventory service.
#[async_trait]
pub trait InventoryClient: Send + Sync {
    /// Fetch a movie by ID.
    async fn get_movie(&self, id: i64) -> Result<Movie, InventoryClientError>;

    /// Ask the store to decrement stock. The store re-checks sufficiency.
    async fn reduce_stock(&self, id: i64, quantity: i64) -> Result<Movie, InventoryClientError>;

    /// Give previously reserved stock back.
    async fn restore_stock(&self, id: i64, quantity: i64) -> Result<Movie, InventoryClientError>;
}

/// HTTP implementation against the inventory service's `/api/movies` routes.
pub struct HttpInventoryClient {
    client: Client,
    base_url: String,
}

impl HttpInventoryClient {
    /// Create a new client with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, InventoryClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InventoryClientError::ApiError(e.to_string()))?;

        Ok(Self::with_client(client, base_url))
    }

    /// Create a client sharing an existing connection pool.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn movie_url(&self, id: i64) -> String {
        format!("{}/api/movies/{}", self.base_url, id)
    }

    async fn post_quantity(
        &self,
        id: i64,
        action: &str,
        quantity: i64,
    ) -> Result<Movie, InventoryClientError> {
        let url = format!("{}/{}", self.movie_url(id), action);
        debug!("POST {} quantity={}", url, quantity);

        let response = self
            .client
            .post(&url)
            .json(&json!({ "quantity": quantity }))
            .send()
            .await
            .map_err(map_transport_error)?;

        match response.status() {
            StatusCode::OK => parse_movie(response).await,
            StatusCode::NOT_FOUND => Err(InventoryClientError::NotFound(id)),
            StatusCode::BAD_REQUEST => Err(InventoryClientError::InsufficientStock(id)),
            status => Err(InventoryClientError::ApiError(format!("HTTP {}", status))),
        }
    }
}

fn map_transport_error(e: reqwest::Error) -> InventoryClientError {
    if e.is_timeout() {
        InventoryClientError::Timeout
    } else if e.is_connect() {
        InventoryClientError::ConnectionFailed(e.to_string())
    } else {
        InventoryClientError::ApiError(e.to_string())
    }
}

async fn parse_movie(response: Response) -> Result<Movie, InventoryClientError> {
    response.json::<Movie>().await.map_err(|e| {
        if e.is_timeout() {
            InventoryClientError::Timeout
        } else {
            InventoryClientError::ApiError(format!("Invalid movie payload: {}", e))
        }
    })
}

#[async_trait]
impl InventoryClient for HttpInventoryClient {
    async fn get_movie(&self, id: i64) -> Result<Movie, InventoryClientError> {
        let result = self.fetch_movie(id).await;
        record("get_movie", &result);
        result
    }

    async fn reduce_stock(&self, id: i64, quantity: i64) -> Result<Movie, InventoryClientError> {
        let result = self.post_quantity(id, "reduce-stock", quantity).await;
        record("reduce_stock", &result);
        result
    }

    async fn restore_stock(&self, id: i64, quantity: i64) -> Result<Movie, InventoryClientError> {
        let result = self.post_quantity(id, "restore-stock", quantity).await;
        record("restore_stock", &result);
        result
    }
}

impl HttpInventoryClient {
    async fn fetch_movie(&self, id: i64) -> Result<Movie, InventoryClientError> {
        let url = self.movie_url(id);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(map_transport_error)?;

        match response.status() {
            StatusCode::OK => parse_movie(response).await,
            StatusCode::NOT_FOUND => Err(InventoryClientError::NotFound(id)),
            status => Err(InventoryClientError::ApiError(format!("HTTP {}", status))),
        }
    }
}

/// Count a call; domain answers (404, 400) are successful round trips.
fn record(operation: &str, result: &Result<Movie, InventoryClientError>) {
    let status = match result {
        Ok(_)
        | Err(InventoryClientError::NotFound(_))
        | Err(InventoryClientError::InsufficientStock(_)) => "success",
        Err(_) => "error",
    };
    metrics::INVENTORY_REQUESTS
        .with_label_values(&[operation, status])
        .inc();
}

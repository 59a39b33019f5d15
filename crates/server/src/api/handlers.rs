use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use boxoffice_core::{ConsumerStatus, SanitizedConfig};
use serde::Serialize;
use std::sync::Arc;

use crate::metrics::encode_metrics;
use crate::state::{BillingState, GatewayState, InventoryState};

/// Error body shared by every service: `{"error": "..."}`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Status and body returned by failing handlers
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Build an error response with the given status.
pub fn error_response(status: StatusCode, message: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

/// Unwrap a numeric path id. Anything that is not an `i64` names no resource,
/// so it answers 404 with `not_found`.
pub fn path_id(
    path: Result<Path<i64>, PathRejection>,
    not_found: &str,
) -> Result<i64, ApiError> {
    match path {
        Ok(Path(id)) => Ok(id),
        Err(_) => Err(error_response(StatusCode::NOT_FOUND, not_found)),
    }
}

/// Body for plain acknowledgements such as deletes
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumer: Option<ConsumerStatus>,
}

impl HealthResponse {
    fn healthy(service: &str) -> Self {
        Self {
            status: "healthy".to_string(),
            service: service.to_string(),
            consumer: None,
        }
    }
}

pub async fn gateway_health() -> Json<HealthResponse> {
    Json(HealthResponse::healthy("api-gateway"))
}

pub async fn inventory_health() -> Json<HealthResponse> {
    Json(HealthResponse::healthy("inventory-app"))
}

pub async fn billing_health(State(state): State<Arc<BillingState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        consumer: state.consumer_status(),
        ..HealthResponse::healthy("billing-app")
    })
}

pub async fn gateway_config(State(state): State<Arc<GatewayState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

pub async fn inventory_config(State(state): State<Arc<InventoryState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

pub async fn billing_config(State(state): State<Arc<BillingState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

/// Prometheus text exposition
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}

//! Billing API handlers.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use boxoffice_core::{Order, OrderError, OrderFilter, OrderStatus};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

use super::handlers::{error_response, path_id, ApiError};
use crate::state::BillingState;

/// Maximum allowed limit for order queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for order queries
const DEFAULT_LIMIT: i64 = 100;

/// Query parameters for listing orders
#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersParams {
    /// Maximum number of orders to return
    pub limit: Option<i64>,
    /// Pagination offset
    pub offset: Option<i64>,
}

impl ListOrdersParams {
    fn filter(&self) -> OrderFilter {
        OrderFilter::new()
            .with_limit(self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT))
            .with_offset(self.offset.unwrap_or(0).max(0))
    }
}

fn map_error(e: OrderError) -> ApiError {
    match e {
        OrderError::NotFound(_) => error_response(StatusCode::NOT_FOUND, "Order not found"),
        OrderError::Database(msg) => {
            error!("Billing database error: {}", msg);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

/// List orders, oldest first
pub async fn list_orders(
    State(state): State<Arc<BillingState>>,
    Query(params): Query<ListOrdersParams>,
) -> Result<Json<Vec<Order>>, ApiError> {
    state
        .store()
        .list(&params.filter())
        .map(Json)
        .map_err(map_error)
}

pub async fn get_order(
    State(state): State<Arc<BillingState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Order>, ApiError> {
    let id = path_id(id, "Order not found")?;
    match state.store().get(id) {
        Ok(Some(order)) => Ok(Json(order)),
        Ok(None) => Err(error_response(StatusCode::NOT_FOUND, "Order not found")),
        Err(e) => Err(map_error(e)),
    }
}

/// List one user's orders
pub async fn list_user_orders(
    State(state): State<Arc<BillingState>>,
    user_id: Result<Path<i64>, PathRejection>,
    Query(params): Query<ListOrdersParams>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let user_id = path_id(user_id, "Not found")?;
    let filter = params.filter().with_user(user_id);
    state.store().list(&filter).map(Json).map_err(map_error)
}

/// Set an order's status; the order must exist and the status must be known
pub async fn update_order_status(
    State(state): State<Arc<BillingState>>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Order>, ApiError> {
    let id = path_id(id, "Order not found")?;
    if state.store().get(id).map_err(map_error)?.is_none() {
        return Err(error_response(StatusCode::NOT_FOUND, "Order not found"));
    }

    let status = payload
        .ok()
        .and_then(|Json(body)| body.get("status").and_then(Value::as_str).map(str::to_string))
        .filter(|status| !status.is_empty())
        .ok_or_else(|| error_response(StatusCode::BAD_REQUEST, "Status is required"))?;

    let status: OrderStatus = status
        .parse()
        .map_err(|e: String| error_response(StatusCode::BAD_REQUEST, &e))?;

    let order = state
        .store()
        .update_status(id, status)
        .map_err(map_error)?;
    info!(order_id = id, status = %order.status, "Order status updated");
    Ok(Json(order))
}

//! Gateway API handlers: order placement and read-through proxies.

use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use boxoffice_core::{PlaceOrderError, PlaceOrderRequest, PurchaseMessage};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use super::handlers::{error_response, path_id, ApiError};
use super::proxy::{forward, ProxyRequest};
use crate::state::GatewayState;

const ORDERS_ENDPOINT: &str = "/api/orders";

/// Body of an accepted order
#[derive(Debug, Serialize)]
pub struct OrderAcceptedResponse {
    pub message: String,
    pub order_data: PurchaseMessage,
}

// ============================================================================
// Order placement
// ============================================================================

/// Place an order: reserve stock, then queue the purchase for billing
pub async fn place_order(
    State(state): State<Arc<GatewayState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let response = match parse_order(payload) {
        Ok(request) => match state.orchestrator().place_order(request).await {
            Ok(order_data) => {
                info!(
                    user_id = order_data.user_id,
                    movie_id = order_data.movie_id,
                    quantity = order_data.quantity,
                    "Order queued"
                );
                (
                    StatusCode::ACCEPTED,
                    Json(OrderAcceptedResponse {
                        message: "Order received and queued for processing".to_string(),
                        order_data,
                    }),
                )
                    .into_response()
            }
            Err(e) => placement_error(&e).into_response(),
        },
        Err(rejection) => rejection.into_response(),
    };

    state
        .record_request(ORDERS_ENDPOINT, "POST", response.status().as_u16())
        .await;
    response
}

fn parse_order(
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<PlaceOrderRequest, ApiError> {
    let missing = || error_response(StatusCode::BAD_REQUEST, "Missing required fields");

    let Json(body) = payload.map_err(|e| {
        warn!("Rejected order body: {}", e);
        missing()
    })?;

    let mut fields = [0i64; 3];
    for (slot, name) in fields.iter_mut().zip(["user_id", "movie_id", "quantity"]) {
        let value = match body.get(name) {
            None | Some(Value::Null) => return Err(missing()),
            Some(value) => value,
        };
        *slot = value.as_i64().ok_or_else(|| {
            error_response(
                StatusCode::BAD_REQUEST,
                &format!("Invalid field: {} must be an integer", name),
            )
        })?;
    }

    let [user_id, movie_id, quantity] = fields;
    Ok(PlaceOrderRequest {
        user_id,
        movie_id,
        quantity,
    })
}

fn placement_error(e: &PlaceOrderError) -> ApiError {
    match e {
        PlaceOrderError::Invalid(_) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
        PlaceOrderError::NotFound(_) => error_response(StatusCode::NOT_FOUND, "Movie not found"),
        PlaceOrderError::InsufficientStock { .. } => {
            error_response(StatusCode::BAD_REQUEST, "Insufficient stock")
        }
        PlaceOrderError::UpstreamUnavailable(_) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to reduce stock")
        }
        PlaceOrderError::QueueUnavailable(_) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to queue order")
        }
    }
}

// ============================================================================
// Proxies
// ============================================================================

pub async fn list_movies(State(state): State<Arc<GatewayState>>) -> Response {
    let url = format!("{}/api/movies", state.inventory_url());
    forward(
        &state,
        ProxyRequest {
            method: Method::GET,
            url,
            endpoint: "/api/movies",
            body: None,
            failure: "Failed to fetch movies",
        },
    )
    .await
}

pub async fn get_movie(
    State(state): State<Arc<GatewayState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Response {
    let id = match path_id(id, "Movie not found") {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };
    let endpoint = format!("/api/movies/{}", id);
    let url = format!("{}{}", state.inventory_url(), endpoint);
    forward(
        &state,
        ProxyRequest {
            method: Method::GET,
            url,
            endpoint: &endpoint,
            body: None,
            failure: "Failed to fetch movie",
        },
    )
    .await
}

pub async fn create_movie(State(state): State<Arc<GatewayState>>, body: Bytes) -> Response {
    let url = format!("{}/api/movies", state.inventory_url());
    forward(
        &state,
        ProxyRequest {
            method: Method::POST,
            url,
            endpoint: "/api/movies",
            body: Some(body),
            failure: "Failed to create movie",
        },
    )
    .await
}

pub async fn list_orders(State(state): State<Arc<GatewayState>>) -> Response {
    let url = format!("{}{}", state.billing_url(), ORDERS_ENDPOINT);
    forward(
        &state,
        ProxyRequest {
            method: Method::GET,
            url,
            endpoint: ORDERS_ENDPOINT,
            body: None,
            failure: "Failed to fetch orders",
        },
    )
    .await
}

pub async fn get_order(
    State(state): State<Arc<GatewayState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Response {
    let id = match path_id(id, "Order not found") {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };
    let endpoint = format!("/api/orders/{}", id);
    let url = format!("{}{}", state.billing_url(), endpoint);
    forward(
        &state,
        ProxyRequest {
            method: Method::GET,
            url,
            endpoint: &endpoint,
            body: None,
            failure: "Failed to fetch order",
        },
    )
    .await
}

pub async fn list_user_orders(
    State(state): State<Arc<GatewayState>>,
    user_id: Result<Path<i64>, PathRejection>,
) -> Response {
    let user_id = match path_id(user_id, "Not found") {
        Ok(user_id) => user_id,
        Err(e) => return e.into_response(),
    };
    let endpoint = format!("/api/orders/user/{}", user_id);
    let url = format!("{}{}", state.billing_url(), endpoint);
    forward(
        &state,
        ProxyRequest {
            method: Method::GET,
            url,
            endpoint: &endpoint,
            body: None,
            failure: "Failed to fetch user orders",
        },
    )
    .await
}

//! Pass-through calls from the gateway to the inventory and billing services.

use axum::{
    body::Bytes,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::state::GatewayState;

/// One proxied call.
pub struct ProxyRequest<'a> {
    pub method: Method,
    pub url: String,
    /// Path recorded in the request log
    pub endpoint: &'a str,
    /// JSON body forwarded verbatim
    pub body: Option<Bytes>,
    /// Error message returned when the upstream cannot be reached
    pub failure: &'a str,
}

/// Forward a request and hand the upstream status and JSON body back unchanged.
///
/// Transport failures become `502 {"error": failure}` and a body that is not
/// JSON becomes `502 {"error": "Invalid upstream response"}`.
pub async fn forward(state: &GatewayState, request: ProxyRequest<'_>) -> Response {
    let (status, body) = exchange(state, &request).await;
    state
        .record_request(request.endpoint, request.method.as_str(), status.as_u16())
        .await;
    (status, Json(body)).into_response()
}

async fn exchange(state: &GatewayState, request: &ProxyRequest<'_>) -> (StatusCode, Value) {
    let mut builder = state.http().request(request.method.clone(), &request.url);
    if let Some(ref body) = request.body {
        builder = builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.clone());
    }

    let response = match builder.send().await {
        Ok(response) => response,
        Err(e) => {
            error!(
                method = %request.method,
                url = %request.url,
                "{}: {}",
                request.failure,
                e
            );
            return (StatusCode::BAD_GATEWAY, json!({ "error": request.failure }));
        }
    };

    let status = StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    match response.json::<Value>().await {
        Ok(body) => (status, body),
        Err(e) => {
            warn!(
                url = %request.url,
                upstream_status = status.as_u16(),
                "Upstream returned a non-JSON body: {}",
                e
            );
            (
                StatusCode::BAD_GATEWAY,
                json!({ "error": "Invalid upstream response" }),
            )
        }
    }
}

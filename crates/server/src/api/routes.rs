use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{gateway, handlers, middleware::metrics_middleware, movies, orders};
use crate::state::{BillingState, GatewayState, InventoryState};

/// Public entry point: order placement plus proxies to inventory and billing.
pub fn gateway_router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/health", get(handlers::gateway_health))
        .route("/config", get(handlers::gateway_config))
        .route("/metrics", get(handlers::metrics))
        // Movies (inventory)
        .route(
            "/api/movies",
            get(gateway::list_movies).post(gateway::create_movie),
        )
        .route("/api/movies/{id}", get(gateway::get_movie))
        // Orders (billing reads, local placement)
        .route(
            "/api/orders",
            get(gateway::list_orders).post(gateway::place_order),
        )
        .route("/api/orders/{id}", get(gateway::get_order))
        .route("/api/orders/user/{user_id}", get(gateway::list_user_orders))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Movie store with atomic stock adjustments.
pub fn inventory_router(state: Arc<InventoryState>) -> Router {
    let api_routes = Router::new()
        .route(
            "/movies",
            get(movies::list_movies).post(movies::create_movie),
        )
        .route(
            "/movies/{id}",
            get(movies::get_movie)
                .put(movies::update_movie)
                .delete(movies::delete_movie),
        )
        .route("/movies/{id}/reduce-stock", post(movies::reduce_stock))
        .route("/movies/{id}/restore-stock", post(movies::restore_stock));

    Router::new()
        .route("/health", get(handlers::inventory_health))
        .route("/config", get(handlers::inventory_config))
        .route("/metrics", get(handlers::metrics))
        .nest("/api", api_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Order store written by the consumer and read through the gateway.
pub fn billing_router(state: Arc<BillingState>) -> Router {
    let api_routes = Router::new()
        .route("/orders", get(orders::list_orders))
        .route("/orders/{id}", get(orders::get_order))
        .route("/orders/{id}/status", put(orders::update_order_status))
        .route("/orders/user/{user_id}", get(orders::list_user_orders));

    Router::new()
        .route("/health", get(handlers::billing_health))
        .route("/config", get(handlers::billing_config))
        .route("/metrics", get(handlers::metrics))
        .nest("/api", api_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

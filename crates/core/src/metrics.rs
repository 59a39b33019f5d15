//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Order placement (outcomes, latency, compensations)
//! - Order consumer (message outcomes, resubscriptions)
//! - Inventory calls made by the gateway

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Order Placement Metrics
// =============================================================================

/// Order placements total by result.
pub static ORDERS_PLACED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("boxoffice_orders_placed_total", "Total order placements"),
        // "accepted", "invalid", "not_found", "insufficient_stock",
        // "upstream_unavailable", "queue_unavailable"
        &["result"],
    )
    .unwrap()
});

/// Order placement duration in seconds.
pub static ORDER_PLACEMENT_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "boxoffice_order_placement_duration_seconds",
            "Duration of order placement including publish",
        )
        .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["result"],
    )
    .unwrap()
});

/// Stock restorations after a failed publish, by result.
pub static STOCK_COMPENSATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "boxoffice_stock_compensations_total",
            "Stock restorations attempted after a failed publish",
        ),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

/// Inventory service calls made by the gateway.
pub static INVENTORY_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "boxoffice_inventory_requests_total",
            "Total inventory service requests",
        ),
        &["operation", "status"], // status: "success", "error"
    )
    .unwrap()
});

// =============================================================================
// Consumer Metrics
// =============================================================================

/// Consumed messages by outcome.
pub static CONSUMER_MESSAGES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "boxoffice_consumer_messages_total",
            "Purchase messages handled by the order consumer",
        ),
        &["outcome"], // "persisted", "requeued", "dead_lettered", "settle_failed"
    )
    .unwrap()
});

/// Subscription attempts after the first.
pub static CONSUMER_RECONNECTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "boxoffice_consumer_reconnects_total",
        "Total consumer resubscription attempts",
    )
    .unwrap()
});

/// Consumer subscription state (1 = subscribed, 0 = not).
pub static CONSUMER_SUBSCRIBED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "boxoffice_consumer_subscribed",
        "Whether the order consumer holds a live subscription",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Placement
        Box::new(ORDERS_PLACED.clone()),
        Box::new(ORDER_PLACEMENT_DURATION.clone()),
        Box::new(STOCK_COMPENSATIONS.clone()),
        Box::new(INVENTORY_REQUESTS.clone()),
        // Consumer
        Box::new(CONSUMER_MESSAGES.clone()),
        Box::new(CONSUMER_RECONNECTS.clone()),
        Box::new(CONSUMER_SUBSCRIBED.clone()),
    ]
}

//! Order orchestrator.
//!
//! Validates a purchase, reserves stock through the inventory service and
//! hands the purchase to the queue. The caller learns synchronously whether
//! the order was accepted; persistence happens later in the billing consumer.

mod runner;
mod types;

pub use runner::OrderOrchestrator;
pub use types::{PlaceOrderError, PlaceOrderRequest};

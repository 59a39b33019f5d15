//! HTTP surface for the gateway, inventory and billing services.

pub mod api;
pub mod bootstrap;
pub mod metrics;
pub mod state;

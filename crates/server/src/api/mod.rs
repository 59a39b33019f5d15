pub mod gateway;
pub mod handlers;
pub mod middleware;
pub mod movies;
pub mod orders;
pub mod proxy;
pub mod routes;

pub use routes::{billing_router, gateway_router, inventory_router};

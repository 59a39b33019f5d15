//! Billing: persisted orders.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteOrderStore;
pub use store::{OrderError, OrderFilter, OrderStore};
pub use types::{NewOrder, Order, OrderStatus};

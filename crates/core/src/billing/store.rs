//! Order storage trait and types.

use thiserror::Error;

use super::{NewOrder, Order, OrderStatus};

/// Error type for order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Order not found.
    #[error("Order not found: {0}")]
    NotFound(i64),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

/// Filter for querying orders.
#[derive(Debug, Clone)]
pub struct OrderFilter {
    /// Filter by purchasing user.
    pub user_id: Option<i64>,
    /// Maximum number of results.
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl Default for OrderFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderFilter {
    /// Create a new filter with defaults.
    pub fn new() -> Self {
        Self {
            user_id: None,
            limit: 100,
            offset: 0,
        }
    }

    /// Filter by user.
    pub fn with_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Set limit.
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// Set offset.
    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Trait for order storage backends.
pub trait OrderStore: Send + Sync {
    /// Insert a new order, assigning its ID and timestamps.
    fn create(&self, order: NewOrder) -> Result<Order, OrderError>;

    /// Get an order by ID.
    fn get(&self, id: i64) -> Result<Option<Order>, OrderError>;

    /// List orders matching the filter, oldest first.
    fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, OrderError>;

    /// Count orders matching the filter (ignores limit/offset).
    fn count(&self, filter: &OrderFilter) -> Result<i64, OrderError>;

    /// Change an order's status.
    fn update_status(&self, id: i64, status: OrderStatus) -> Result<Order, OrderError>;
}

//! Order store wrapper that fails inserts on demand.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::billing::{NewOrder, Order, OrderError, OrderFilter, OrderStatus, OrderStore};

/// Wraps an `OrderStore` and fails the next `n` calls to `create`.
///
/// Reads and status updates go straight to the inner store.
pub struct FailingOrderStore {
    inner: Arc<dyn OrderStore>,
    remaining_failures: AtomicUsize,
    attempts: AtomicUsize,
    /// Panic instead of returning an error.
    panics: bool,
}

impl FailingOrderStore {
    /// Fail the first `failures` inserts, then delegate.
    pub fn new(inner: Arc<dyn OrderStore>, failures: usize) -> Self {
        Self {
            inner,
            remaining_failures: AtomicUsize::new(failures),
            attempts: AtomicUsize::new(0),
            panics: false,
        }
    }

    /// Panic on the first `failures` inserts, then delegate.
    pub fn panicking(inner: Arc<dyn OrderStore>, failures: usize) -> Self {
        Self {
            panics: true,
            ..Self::new(inner, failures)
        }
    }

    /// Fail every insert.
    pub fn always(inner: Arc<dyn OrderStore>) -> Self {
        Self::new(inner, usize::MAX)
    }

    /// Number of `create` calls seen, failed or not.
    pub fn create_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl OrderStore for FailingOrderStore {
    fn create(&self, order: NewOrder) -> Result<Order, OrderError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing && self.panics {
            panic!("simulated commit panic");
        }
        if failing {
            return Err(OrderError::Database("simulated commit failure".to_string()));
        }

        self.inner.create(order)
    }

    fn get(&self, id: i64) -> Result<Option<Order>, OrderError> {
        self.inner.get(id)
    }

    fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, OrderError> {
        self.inner.list(filter)
    }

    fn count(&self, filter: &OrderFilter) -> Result<i64, OrderError> {
        self.inner.count(filter)
    }

    fn update_status(&self, id: i64, status: OrderStatus) -> Result<Order, OrderError> {
        self.inner.update_status(id, status)
    }
}

//! Testing utilities and mock implementations.
//!
//! This module provides in-memory stand-ins for the services the gateway and
//! the billing consumer talk to, so order placement and consumption can be
//! tested without a broker or a running inventory service.
//!
//! # Example
//!
//! ```rust,ignore
//! use boxoffice_core::testing::{fixtures, MemoryQueue, MockInventoryClient};
//!
//! let inventory = MockInventoryClient::new();
//! inventory.insert(fixtures::movie(1, "Alien", Decimal::new(1000, 2), 5));
//!
//! let queue = MemoryQueue::new();
//! queue.fail_publishes(true);
//!
//! // Use in an OrderOrchestrator...
//! ```

mod failing_store;
mod memory_queue;
mod mock_inventory;

pub use failing_store::FailingOrderStore;
pub use memory_queue::MemoryQueue;
pub use mock_inventory::{InventoryCall, MockInventoryClient};

/// Test fixtures and helper functions.
pub mod fixtures {
    use rust_decimal::Decimal;

    use crate::inventory::{Movie, NewMovie};
    use crate::purchase::{line_total, PurchaseMessage};

    /// Create a movie with an empty description.
    pub fn movie(id: i64, title: &str, price: Decimal, stock: i64) -> Movie {
        Movie {
            id,
            title: title.to_string(),
            description: String::new(),
            price,
            stock,
        }
    }

    /// Create a movie insert request.
    pub fn new_movie(title: &str, price: Decimal, stock: i64) -> NewMovie {
        NewMovie {
            title: title.to_string(),
            description: format!("{} on DVD", title),
            price,
            stock,
        }
    }

    /// Create a consistent purchase message for `quantity` copies at `price`.
    ///
    /// Panics if the total overflows.
    pub fn purchase(user_id: i64, movie_id: i64, price: Decimal, quantity: i64) -> PurchaseMessage {
        PurchaseMessage {
            user_id,
            movie_id,
            movie_title: format!("Movie {}", movie_id),
            quantity,
            price,
            total_amount: line_total(price, quantity).expect("fixture total overflows"),
        }
    }
}

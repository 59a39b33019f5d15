//! Order consumer for the billing service.
//!
//! Each delivery ends in one of three ways:
//! - **Persisted**: an order row is written, then the delivery is acked
//! - **Requeued**: persistence failed; nacked with an exponential delay
//! - **Dead-lettered**: malformed, inconsistent or out of attempts; published
//!   to the dead-letter subject, then terminated

mod backoff;
mod runner;
mod types;

pub use backoff::{redelivery_delay, Backoff};
pub use runner::{OrderConsumer, PurchaseHandler};
pub use types::{ConsumerStatus, Disposition};

//! Queue transport abstraction.
//!
//! Purchase messages travel from the gateway to the billing consumer through a
//! `MessageQueue`. The production backend is NATS JetStream; tests use
//! `crate::testing::MemoryQueue`.

mod jetstream;
mod types;

pub use jetstream::JetStreamQueue;
pub use types::*;

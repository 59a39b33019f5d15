//! Types for the order consumer.

use std::time::Duration;

use serde::Serialize;

/// What to do with a delivery once it has been processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Order persisted; acknowledge.
    Ack { order_id: i64 },
    /// Transient failure; ask for redelivery after `delay`.
    Requeue { delay: Duration },
    /// Can never be persisted; quarantine and terminate.
    DeadLetter { reason: String },
}

impl Disposition {
    /// Label used for metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            Disposition::Ack { .. } => "persisted",
            Disposition::Requeue { .. } => "requeued",
            Disposition::DeadLetter { .. } => "dead_lettered",
        }
    }
}

/// Current status of the consumer.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ConsumerStatus {
    /// Whether the consumer loop is running.
    pub running: bool,
    /// Whether it currently holds a subscription.
    pub subscribed: bool,
}

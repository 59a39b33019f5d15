//! Queue transport traits and errors.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the queue transport.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Could not reach the broker or set up the stream.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The broker refused or failed to persist a message.
    #[error("Publish failed: {0}")]
    PublishFailed(String),

    /// The broker did not answer in time.
    #[error("Queue operation timed out after {0:?}")]
    Timeout(Duration),

    /// Acknowledging a delivery failed.
    #[error("Acknowledgement failed: {0}")]
    AckFailed(String),

    /// The subscription is gone and must be re-established.
    #[error("Subscription closed: {0}")]
    Closed(String),
}

/// A durable, at-least-once queue with manual acknowledgement.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Backend name, used in logs.
    fn name(&self) -> &str;

    /// Publish a purchase message and wait until the broker has persisted it.
    async fn publish(&self, payload: Vec<u8>) -> Result<(), QueueError>;

    /// Publish a quarantined delivery to the dead-letter subject.
    async fn publish_dead_letter(&self, payload: Vec<u8>) -> Result<(), QueueError>;

    /// Open a subscription on the purchase subject.
    async fn subscribe(&self) -> Result<Box<dyn Subscription>, QueueError>;
}

/// A stream of deliveries from a subscription.
#[async_trait]
pub trait Subscription: Send {
    /// Wait for the next delivery.
    ///
    /// `None` means the subscription ended and the caller should resubscribe.
    async fn next_delivery(&mut self) -> Option<Result<Box<dyn Delivery>, QueueError>>;
}

/// One delivered message awaiting a settlement decision.
#[async_trait]
pub trait Delivery: Send + Sync {
    /// Raw message body.
    fn payload(&self) -> &[u8];

    /// 1-based delivery attempt for this message.
    fn attempt(&self) -> u32;

    /// Confirm the message was handled; it will not be redelivered.
    async fn ack(&self) -> Result<(), QueueError>;

    /// Ask for redelivery after `delay`.
    async fn nack(&self, delay: Duration) -> Result<(), QueueError>;

    /// Drop the message permanently without redelivery.
    async fn reject(&self) -> Result<(), QueueError>;
}

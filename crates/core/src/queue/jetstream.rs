//! NATS JetStream implementation of the queue transport.

use std::time::Duration;

use async_nats::jetstream::{
    self,
    consumer::{pull, AckPolicy},
    stream::StorageType,
    AckKind,
};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::{Delivery, MessageQueue, QueueError, Subscription};
use crate::config::QueueConfig;

/// JetStream-backed queue.
///
/// The broker connection and stream are set up on first use, so a service can
/// start while the broker is still unreachable. A failed setup is retried by
/// the next call.
pub struct JetStreamQueue {
    config: QueueConfig,
    context: OnceCell<jetstream::Context>,
    stream: OnceCell<jetstream::stream::Stream>,
}

impl JetStreamQueue {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            context: OnceCell::new(),
            stream: OnceCell::new(),
        }
    }

    fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.config.publish_timeout_secs)
    }

    async fn context(&self) -> Result<&jetstream::Context, QueueError> {
        self.context
            .get_or_try_init(|| async {
                let options = match (&self.config.user, &self.config.password) {
                    (Some(user), Some(password)) => async_nats::ConnectOptions::with_user_and_password(
                        user.clone(),
                        password.clone(),
                    ),
                    _ => async_nats::ConnectOptions::new(),
                };

                let client = options
                    .connection_timeout(self.connect_timeout())
                    .connect(self.config.url.as_str())
                    .await
                    .map_err(|e| QueueError::ConnectionFailed(e.to_string()))?;

                info!(url = %self.config.url, "Connected to NATS");
                Ok(jetstream::new(client))
            })
            .await
    }

    /// Declare the durable stream holding the purchase and dead-letter subjects.
    async fn stream(&self) -> Result<&jetstream::stream::Stream, QueueError> {
        let context = self.context().await?;

        self.stream
            .get_or_try_init(|| async {
                let stream = context
                    .get_or_create_stream(jetstream::stream::Config {
                        name: self.config.stream.clone(),
                        subjects: vec![
                            self.config.subject.clone(),
                            self.config.dead_letter_subject.clone(),
                        ],
                        storage: StorageType::File,
                        ..Default::default()
                    })
                    .await
                    .map_err(|e| QueueError::ConnectionFailed(e.to_string()))?;

                debug!(stream = %self.config.stream, "JetStream stream ready");
                Ok(stream)
            })
            .await
    }

    async fn publish_to(&self, subject: &str, payload: Vec<u8>) -> Result<(), QueueError> {
        // The stream must exist before publishing or the broker has nowhere to persist.
        self.stream().await?;
        let context = self.context().await?;

        let ack = context
            .publish(subject.to_string(), payload.into())
            .await
            .map_err(|e| QueueError::PublishFailed(e.to_string()))?;

        ack.await
            .map_err(|e| QueueError::PublishFailed(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl MessageQueue for JetStreamQueue {
    fn name(&self) -> &str {
        "jetstream"
    }

    async fn publish(&self, payload: Vec<u8>) -> Result<(), QueueError> {
        self.publish_to(&self.config.subject, payload).await
    }

    async fn publish_dead_letter(&self, payload: Vec<u8>) -> Result<(), QueueError> {
        self.publish_to(&self.config.dead_letter_subject, payload).await
    }

    async fn subscribe(&self) -> Result<Box<dyn Subscription>, QueueError> {
        let stream = self.stream().await?;

        let consumer = stream
            .get_or_create_consumer(
                &self.config.consumer_name,
                pull::Config {
                    durable_name: Some(self.config.consumer_name.clone()),
                    filter_subject: self.config.subject.clone(),
                    ack_policy: AckPolicy::Explicit,
                    max_ack_pending: i64::from(self.config.prefetch),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| QueueError::ConnectionFailed(e.to_string()))?;

        let messages = consumer
            .messages()
            .await
            .map_err(|e| QueueError::ConnectionFailed(e.to_string()))?
            .map(|result| result.map_err(|e| e.to_string()))
            .boxed();

        info!(
            consumer = %self.config.consumer_name,
            subject = %self.config.subject,
            prefetch = self.config.prefetch,
            "Subscribed to JetStream consumer"
        );

        Ok(Box::new(JetStreamSubscription { messages }))
    }
}

struct JetStreamSubscription {
    messages: BoxStream<'static, Result<jetstream::Message, String>>,
}

#[async_trait]
impl Subscription for JetStreamSubscription {
    async fn next_delivery(&mut self) -> Option<Result<Box<dyn Delivery>, QueueError>> {
        let message = match self.messages.next().await? {
            Ok(message) => message,
            Err(e) => return Some(Err(QueueError::Closed(e))),
        };

        let attempt = match message.info() {
            Ok(info) => u32::try_from(info.delivered).unwrap_or(u32::MAX),
            Err(e) => {
                warn!("Delivery without JetStream metadata: {}", e);
                1
            }
        };

        Some(Ok(Box::new(JetStreamDelivery { message, attempt })))
    }
}

struct JetStreamDelivery {
    message: jetstream::Message,
    attempt: u32,
}

#[async_trait]
impl Delivery for JetStreamDelivery {
    fn payload(&self) -> &[u8] {
        &self.message.message.payload
    }

    fn attempt(&self) -> u32 {
        self.attempt
    }

    async fn ack(&self) -> Result<(), QueueError> {
        self.message
            .ack()
            .await
            .map_err(|e| QueueError::AckFailed(e.to_string()))
    }

    async fn nack(&self, delay: Duration) -> Result<(), QueueError> {
        self.message
            .ack_with(AckKind::Nak(Some(delay)))
            .await
            .map_err(|e| QueueError::AckFailed(e.to_string()))
    }

    async fn reject(&self) -> Result<(), QueueError> {
        self.message
            .ack_with(AckKind::Term)
            .await
            .map_err(|e| QueueError::AckFailed(e.to_string()))
    }
}

//! Order consumer implementation.
//!
//! Turns purchase messages into persisted orders, one delivery at a time.
//! The subscription is supervised: when it fails or ends, the loop
//! resubscribes with exponential backoff until it is stopped.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::billing::{NewOrder, OrderStatus, OrderStore};
use crate::config::ConsumerConfig;
use crate::metrics;
use crate::purchase::{DeadLetter, PurchaseMessage};
use crate::queue::{Delivery, MessageQueue};

use super::backoff::{redelivery_delay, Backoff};
use super::types::{ConsumerStatus, Disposition};

/// Decides and settles single deliveries.
pub struct PurchaseHandler {
    config: ConsumerConfig,
    queue: Arc<dyn MessageQueue>,
    store: Arc<dyn OrderStore>,
}

impl PurchaseHandler {
    pub fn new(
        config: ConsumerConfig,
        queue: Arc<dyn MessageQueue>,
        store: Arc<dyn OrderStore>,
    ) -> Self {
        Self {
            config,
            queue,
            store,
        }
    }

    fn redelivery_delay(&self, attempt: u32) -> Duration {
        redelivery_delay(
            attempt,
            Duration::from_millis(self.config.redelivery_delay_ms),
            Duration::from_millis(self.config.redelivery_delay_max_ms),
        )
    }

    /// Persist the message carried by `payload` and decide how to settle it.
    pub fn process(&self, payload: &[u8], attempt: u32) -> Disposition {
        let message = match PurchaseMessage::from_slice(payload) {
            Ok(message) => message,
            Err(e) => {
                return Disposition::DeadLetter {
                    reason: format!("malformed purchase message: {}", e),
                }
            }
        };

        if let Err(reason) = message.check() {
            return Disposition::DeadLetter {
                reason: format!("invalid purchase message: {}", reason),
            };
        }

        debug!(
            user_id = message.user_id,
            movie_id = message.movie_id,
            attempt,
            "Received purchase message"
        );

        match self
            .store
            .create(NewOrder::from_purchase(&message, OrderStatus::Processing))
        {
            Ok(order) => Disposition::Ack { order_id: order.id },
            Err(e) if attempt >= self.config.max_deliveries => Disposition::DeadLetter {
                reason: format!("order not persisted after {} attempts: {}", attempt, e),
            },
            Err(e) => {
                let delay = self.redelivery_delay(attempt);
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Failed to persist order, requeueing: {}",
                    e
                );
                Disposition::Requeue { delay }
            }
        }
    }

    /// Process a delivery and settle it with the broker.
    ///
    /// Returns the disposition that was applied. A dead letter that cannot be
    /// published is requeued instead, so the message is never dropped.
    pub async fn handle(&self, delivery: &dyn Delivery) -> Disposition {
        let attempt = delivery.attempt();
        let disposition = self.process(delivery.payload(), attempt);

        let applied = match disposition {
            Disposition::Ack { order_id } => {
                info!(order_id, "Order created");
                if let Err(e) = delivery.ack().await {
                    // The broker will redeliver; the order row may end up duplicated.
                    error!(order_id, "Failed to acknowledge persisted order: {}", e);
                    metrics::CONSUMER_MESSAGES
                        .with_label_values(&["settle_failed"])
                        .inc();
                }
                Disposition::Ack { order_id }
            }
            Disposition::Requeue { delay } => {
                self.requeue(delivery, delay).await;
                Disposition::Requeue { delay }
            }
            Disposition::DeadLetter { reason } => self.dead_letter(delivery, reason).await,
        };

        metrics::CONSUMER_MESSAGES
            .with_label_values(&[applied.outcome()])
            .inc();
        applied
    }

    /// Like [`handle`](Self::handle), but a panic while processing dead-letters
    /// the delivery instead of unwinding into the consume loop.
    pub async fn handle_guarded(&self, delivery: &dyn Delivery) -> Disposition {
        let panic = match AssertUnwindSafe(self.handle(delivery)).catch_unwind().await {
            Ok(disposition) => return disposition,
            Err(panic) => panic,
        };

        let reason = format!("handler panicked: {}", panic_message(&*panic));
        error!(attempt = delivery.attempt(), "{}", reason);
        let applied = self.dead_letter(delivery, reason).await;
        metrics::CONSUMER_MESSAGES
            .with_label_values(&[applied.outcome()])
            .inc();
        applied
    }

    async fn requeue(&self, delivery: &dyn Delivery, delay: Duration) {
        if let Err(e) = delivery.nack(delay).await {
            error!("Failed to requeue delivery: {}", e);
            metrics::CONSUMER_MESSAGES
                .with_label_values(&["settle_failed"])
                .inc();
        }
    }

    async fn dead_letter(&self, delivery: &dyn Delivery, reason: String) -> Disposition {
        let attempt = delivery.attempt();
        let letter = DeadLetter::new(reason.clone(), attempt, delivery.payload());

        let published = match serde_json::to_vec(&letter) {
            Ok(body) => self.queue.publish_dead_letter(body).await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match published {
            Ok(()) => {
                error!(attempt, "Dead-lettered purchase message: {}", reason);
                if let Err(e) = delivery.reject().await {
                    error!("Failed to terminate dead-lettered delivery: {}", e);
                    metrics::CONSUMER_MESSAGES
                        .with_label_values(&["settle_failed"])
                        .inc();
                }
                Disposition::DeadLetter { reason }
            }
            Err(e) => {
                let delay = self.redelivery_delay(attempt);
                error!(
                    attempt,
                    "Failed to publish dead letter ({}), requeueing instead: {}",
                    reason,
                    e
                );
                self.requeue(delivery, delay).await;
                Disposition::Requeue { delay }
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Clears the status flags when the consume loop exits, on any path.
struct LoopGuard {
    running: Arc<AtomicBool>,
    subscribed: Arc<AtomicBool>,
}

impl Drop for LoopGuard {
    fn drop(&mut self) {
        self.subscribed.store(false, Ordering::Relaxed);
        self.running.store(false, Ordering::Relaxed);
        metrics::CONSUMER_SUBSCRIBED.set(0);
    }
}

/// Background consumer for the billing service.
pub struct OrderConsumer {
    config: ConsumerConfig,
    queue: Arc<dyn MessageQueue>,
    handler: Arc<PurchaseHandler>,

    // Runtime state
    running: Arc<AtomicBool>,
    subscribed: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl OrderConsumer {
    /// Create a new consumer.
    pub fn new(
        config: ConsumerConfig,
        queue: Arc<dyn MessageQueue>,
        store: Arc<dyn OrderStore>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let handler = Arc::new(PurchaseHandler::new(
            config.clone(),
            Arc::clone(&queue),
            store,
        ));

        Self {
            config,
            queue,
            handler,
            running: Arc::new(AtomicBool::new(false)),
            subscribed: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            task: Mutex::new(None),
        }
    }

    /// Start the consumer loop (spawns a background task).
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Order consumer already running");
            return;
        }

        info!(queue = self.queue.name(), "Starting order consumer");

        let handle = self.spawn_consume_loop();
        *self.task.lock().await = Some(handle);
    }

    /// Stop the consumer, letting a delivery in progress finish first.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Order consumer not running");
            return;
        }

        info!("Stopping order consumer");
        let _ = self.shutdown_tx.send(());

        if let Some(handle) = self.task.lock().await.take() {
            if let Err(e) = handle.await {
                error!("Order consumer task failed: {}", e);
            }
        }

        info!("Order consumer stopped");
    }

    /// Get current consumer status.
    pub fn status(&self) -> ConsumerStatus {
        ConsumerStatus {
            running: self.running.load(Ordering::Relaxed),
            subscribed: self.subscribed.load(Ordering::Relaxed),
        }
    }

    fn spawn_consume_loop(&self) -> JoinHandle<()> {
        let running = Arc::clone(&self.running);
        let subscribed = Arc::clone(&self.subscribed);
        let queue = Arc::clone(&self.queue);
        let handler = Arc::clone(&self.handler);
        let mut backoff = Backoff::new(
            Duration::from_millis(self.config.reconnect_initial_ms),
            Duration::from_millis(self.config.reconnect_max_ms),
        );
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let _guard = LoopGuard {
                running: Arc::clone(&running),
                subscribed: Arc::clone(&subscribed),
            };
            info!("Consume loop started");
            let mut first_attempt = true;

            'subscribe: while running.load(Ordering::Relaxed) {
                if !first_attempt {
                    metrics::CONSUMER_RECONNECTS.inc();
                }
                first_attempt = false;

                let result = tokio::select! {
                    _ = shutdown_rx.recv() => break 'subscribe,
                    result = queue.subscribe() => result,
                };

                match result {
                    Ok(mut subscription) => {
                        backoff.reset();
                        subscribed.store(true, Ordering::Relaxed);
                        metrics::CONSUMER_SUBSCRIBED.set(1);

                        loop {
                            let next = tokio::select! {
                                _ = shutdown_rx.recv() => {
                                    subscribed.store(false, Ordering::Relaxed);
                                    metrics::CONSUMER_SUBSCRIBED.set(0);
                                    break 'subscribe;
                                }
                                next = subscription.next_delivery() => next,
                            };

                            match next {
                                // Not raced against shutdown: an in-flight delivery always settles.
                                Some(Ok(delivery)) => {
                                    handler.handle_guarded(delivery.as_ref()).await;
                                }
                                Some(Err(e)) => {
                                    warn!("Subscription failed: {}", e);
                                    break;
                                }
                                None => {
                                    warn!("Subscription ended");
                                    break;
                                }
                            }
                        }

                        subscribed.store(false, Ordering::Relaxed);
                        metrics::CONSUMER_SUBSCRIBED.set(0);
                    }
                    Err(e) => {
                        warn!("Failed to subscribe: {}", e);
                    }
                }

                let delay = backoff.next_delay();
                info!(delay_ms = delay.as_millis() as u64, "Resubscribing after delay");
                tokio::select! {
                    _ = shutdown_rx.recv() => break 'subscribe,
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            info!("Consume loop stopped");
        })
    }
}

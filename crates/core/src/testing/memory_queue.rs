//! In-memory queue for testing.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::queue::{Delivery, MessageQueue, QueueError, Subscription};

#[derive(Debug)]
struct Pending {
    payload: Vec<u8>,
    attempt: u32,
}

#[derive(Debug, Default)]
struct QueueState {
    ready: VecDeque<Pending>,
    published: Vec<Vec<u8>>,
    dead_letters: Vec<Vec<u8>>,
    acked: Vec<Vec<u8>>,
    rejected: Vec<Vec<u8>>,
    nack_delays: Vec<Duration>,
    subscribe_calls: usize,
    /// Bumped to end every open subscription.
    generation: u64,
    fail_publish: bool,
    fail_dead_letter: bool,
    publish_delay: Option<Duration>,
    failing_subscribes: usize,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// In-memory implementation of the MessageQueue trait.
///
/// Published messages become deliveries for subscribers. Nacked deliveries go
/// back to the front of the queue immediately with their attempt count bumped;
/// the requested delay is recorded instead of waited for.
///
/// # Example
///
/// ```rust,ignore
/// let queue = MemoryQueue::new();
/// queue.publish(payload).await?;
///
/// let mut sub = queue.subscribe().await?;
/// let delivery = sub.next_delivery().await.unwrap()?;
/// delivery.ack().await?;
/// assert_eq!(queue.acked().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryQueue {
    shared: Arc<Shared>,
}

impl MemoryQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a raw body as if a producer had published it.
    pub fn push_raw(&self, payload: impl Into<Vec<u8>>) {
        self.shared.lock().ready.push_back(Pending {
            payload: payload.into(),
            attempt: 1,
        });
        self.shared.notify.notify_one();
    }

    /// Make purchase publishes fail (dead-letter publishes are unaffected).
    pub fn fail_publishes(&self, fail: bool) {
        self.shared.lock().fail_publish = fail;
    }

    /// Make dead-letter publishes fail.
    pub fn fail_dead_letters(&self, fail: bool) {
        self.shared.lock().fail_dead_letter = fail;
    }

    /// Delay every purchase publish by `delay`.
    pub fn delay_publishes(&self, delay: Duration) {
        self.shared.lock().publish_delay = Some(delay);
    }

    /// Fail the next `count` subscribe calls.
    pub fn fail_next_subscribes(&self, count: usize) {
        self.shared.lock().failing_subscribes = count;
    }

    /// End every open subscription, as if the broker connection dropped.
    pub fn drop_subscriptions(&self) {
        self.shared.lock().generation += 1;
        self.shared.notify.notify_waiters();
    }

    /// Bodies successfully published to the purchase subject.
    pub fn published(&self) -> Vec<Vec<u8>> {
        self.shared.lock().published.clone()
    }

    /// Bodies published to the dead-letter subject.
    pub fn dead_letters(&self) -> Vec<Vec<u8>> {
        self.shared.lock().dead_letters.clone()
    }

    /// Bodies of acknowledged deliveries.
    pub fn acked(&self) -> Vec<Vec<u8>> {
        self.shared.lock().acked.clone()
    }

    /// Bodies of rejected (terminated) deliveries.
    pub fn rejected(&self) -> Vec<Vec<u8>> {
        self.shared.lock().rejected.clone()
    }

    /// Delays requested by nacks, in order.
    pub fn nack_delays(&self) -> Vec<Duration> {
        self.shared.lock().nack_delays.clone()
    }

    /// Messages waiting for delivery.
    pub fn pending(&self) -> usize {
        self.shared.lock().ready.len()
    }

    /// Number of subscribe calls, including failed ones.
    pub fn subscribe_calls(&self) -> usize {
        self.shared.lock().subscribe_calls
    }
}

#[async_trait]
impl MessageQueue for MemoryQueue {
    fn name(&self) -> &str {
        "memory"
    }

    async fn publish(&self, payload: Vec<u8>) -> Result<(), QueueError> {
        let delay = self.shared.lock().publish_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        {
            let mut state = self.shared.lock();
            if state.fail_publish {
                return Err(QueueError::ConnectionFailed(
                    "memory queue unavailable".to_string(),
                ));
            }
            state.published.push(payload.clone());
            state.ready.push_back(Pending {
                payload,
                attempt: 1,
            });
        }
        self.shared.notify.notify_one();
        Ok(())
    }

    async fn publish_dead_letter(&self, payload: Vec<u8>) -> Result<(), QueueError> {
        let mut state = self.shared.lock();
        if state.fail_dead_letter {
            return Err(QueueError::PublishFailed(
                "memory dead-letter subject unavailable".to_string(),
            ));
        }
        state.dead_letters.push(payload);
        Ok(())
    }

    async fn subscribe(&self) -> Result<Box<dyn Subscription>, QueueError> {
        let mut state = self.shared.lock();
        state.subscribe_calls += 1;
        if state.failing_subscribes > 0 {
            state.failing_subscribes -= 1;
            return Err(QueueError::ConnectionFailed(
                "memory queue refused subscription".to_string(),
            ));
        }

        Ok(Box::new(MemorySubscription {
            shared: Arc::clone(&self.shared),
            generation: state.generation,
        }))
    }
}

struct MemorySubscription {
    shared: Arc<Shared>,
    generation: u64,
}

#[async_trait]
impl Subscription for MemorySubscription {
    async fn next_delivery(&mut self) -> Option<Result<Box<dyn Delivery>, QueueError>> {
        loop {
            let notified = self.shared.notify.notified();
            {
                let mut state = self.shared.lock();
                if state.generation != self.generation {
                    return None;
                }
                if let Some(pending) = state.ready.pop_front() {
                    return Some(Ok(Box::new(MemoryDelivery {
                        shared: Arc::clone(&self.shared),
                        payload: pending.payload,
                        attempt: pending.attempt,
                    })));
                }
            }
            notified.await;
        }
    }
}

struct MemoryDelivery {
    shared: Arc<Shared>,
    payload: Vec<u8>,
    attempt: u32,
}

#[async_trait]
impl Delivery for MemoryDelivery {
    fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn attempt(&self) -> u32 {
        self.attempt
    }

    async fn ack(&self) -> Result<(), QueueError> {
        self.shared.lock().acked.push(self.payload.clone());
        Ok(())
    }

    async fn nack(&self, delay: Duration) -> Result<(), QueueError> {
        {
            let mut state = self.shared.lock();
            state.nack_delays.push(delay);
            state.ready.push_front(Pending {
                payload: self.payload.clone(),
                attempt: self.attempt + 1,
            });
        }
        self.shared.notify.notify_one();
        Ok(())
    }

    async fn reject(&self) -> Result<(), QueueError> {
        self.shared.lock().rejected.push(self.payload.clone());
        Ok(())
    }
}

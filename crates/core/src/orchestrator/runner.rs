//! Order placement.
//!
//! One call runs the whole hand-off: fetch the movie, pre-check stock, snapshot
//! a purchase message, ask the inventory service to decrement (it re-checks
//! atomically) and publish the snapshot. Nothing is retried here.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::config::OrchestratorConfig;
use crate::inventory::{InventoryClient, InventoryClientError};
use crate::metrics;
use crate::purchase::PurchaseMessage;
use crate::queue::{MessageQueue, QueueError};

use super::types::{PlaceOrderError, PlaceOrderRequest};

/// Coordinates the inventory service and the queue for one purchase at a time.
pub struct OrderOrchestrator {
    config: OrchestratorConfig,
    inventory: Arc<dyn InventoryClient>,
    queue: Arc<dyn MessageQueue>,
    publish_timeout: Duration,
}

impl OrderOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        config: OrchestratorConfig,
        inventory: Arc<dyn InventoryClient>,
        queue: Arc<dyn MessageQueue>,
        publish_timeout: Duration,
    ) -> Self {
        Self {
            config,
            inventory,
            queue,
            publish_timeout,
        }
    }

    /// Place an order and return the published purchase message.
    pub async fn place_order(
        &self,
        request: PlaceOrderRequest,
    ) -> Result<PurchaseMessage, PlaceOrderError> {
        let started = Instant::now();
        let result = self.run(request).await;

        let label = match &result {
            Ok(_) => "accepted",
            Err(e) => e.kind(),
        };
        metrics::ORDERS_PLACED.with_label_values(&[label]).inc();
        metrics::ORDER_PLACEMENT_DURATION
            .with_label_values(&[label])
            .observe(started.elapsed().as_secs_f64());

        result
    }

    async fn run(&self, request: PlaceOrderRequest) -> Result<PurchaseMessage, PlaceOrderError> {
        request.validate()?;

        let movie = self
            .inventory
            .get_movie(request.movie_id)
            .await
            .map_err(|e| upstream_error(e, request.movie_id, request.quantity))?;

        if movie.stock < request.quantity {
            info!(
                movie_id = movie.id,
                requested = request.quantity,
                available = movie.stock,
                "Rejecting order: insufficient stock"
            );
            return Err(PlaceOrderError::InsufficientStock {
                movie_id: movie.id,
                requested: request.quantity,
            });
        }

        let message = PurchaseMessage::new(request.user_id, &movie, request.quantity)
            .ok_or_else(|| {
                PlaceOrderError::Invalid(format!(
                    "total for {} copies at {} is too large",
                    request.quantity, movie.price
                ))
            })?;

        // The store re-checks sufficiency; its answer wins over the read above.
        self.inventory
            .reduce_stock(movie.id, request.quantity)
            .await
            .map_err(|e| upstream_error(e, request.movie_id, request.quantity))?;

        self.publish(&message).await?;

        info!(
            user_id = message.user_id,
            movie_id = message.movie_id,
            quantity = message.quantity,
            total_amount = %message.total_amount,
            "Order queued"
        );

        Ok(message)
    }

    async fn publish(&self, message: &PurchaseMessage) -> Result<(), PlaceOrderError> {
        let payload = message
            .to_bytes()
            .map_err(|e| PlaceOrderError::QueueUnavailable(e.to_string()))?;

        let outcome = tokio::time::timeout(self.publish_timeout, self.queue.publish(payload)).await;

        let reason = match outcome {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => e.to_string(),
            Err(_) => QueueError::Timeout(self.publish_timeout).to_string(),
        };

        error!(
            queue = self.queue.name(),
            movie_id = message.movie_id,
            quantity = message.quantity,
            "Failed to publish purchase message, stock already reduced: {}",
            reason
        );

        if self.config.compensate_on_publish_failure {
            self.restore_stock(message).await;
        }

        Err(PlaceOrderError::QueueUnavailable(reason))
    }

    /// Give reserved stock back after a failed publish. Failures are logged only.
    async fn restore_stock(&self, message: &PurchaseMessage) {
        match self
            .inventory
            .restore_stock(message.movie_id, message.quantity)
            .await
        {
            Ok(movie) => {
                metrics::STOCK_COMPENSATIONS
                    .with_label_values(&["success"])
                    .inc();
                warn!(
                    movie_id = movie.id,
                    restored = message.quantity,
                    stock = movie.stock,
                    "Restored stock after failed publish"
                );
            }
            Err(e) => {
                metrics::STOCK_COMPENSATIONS
                    .with_label_values(&["failed"])
                    .inc();
                error!(
                    movie_id = message.movie_id,
                    quantity = message.quantity,
                    "Failed to restore stock after failed publish: {}",
                    e
                );
            }
        }
    }
}

fn upstream_error(e: InventoryClientError, movie_id: i64, quantity: i64) -> PlaceOrderError {
    match e {
        InventoryClientError::NotFound(_) => PlaceOrderError::NotFound(movie_id),
        InventoryClientError::InsufficientStock(_) => PlaceOrderError::InsufficientStock {
            movie_id,
            requested: quantity,
        },
        other => {
            error!(movie_id, "Inventory service call failed: {}", other);
            PlaceOrderError::UpstreamUnavailable(other.to_string())
        }
    }
}

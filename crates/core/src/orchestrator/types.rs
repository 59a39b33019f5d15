//! Types for order placement.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A request to buy `quantity` copies of a movie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    pub user_id: i64,
    pub movie_id: i64,
    pub quantity: i64,
}

impl PlaceOrderRequest {
    /// Check input constraints before touching any remote service.
    pub fn validate(&self) -> Result<(), PlaceOrderError> {
        if self.user_id <= 0 {
            return Err(PlaceOrderError::Invalid(format!(
                "user_id must be a positive integer, got {}",
                self.user_id
            )));
        }
        if self.movie_id <= 0 {
            return Err(PlaceOrderError::Invalid(format!(
                "movie_id must be a positive integer, got {}",
                self.movie_id
            )));
        }
        if self.quantity <= 0 {
            return Err(PlaceOrderError::Invalid(format!(
                "quantity must be a positive integer, got {}",
                self.quantity
            )));
        }
        Ok(())
    }
}

/// Errors that can occur while placing an order.
#[derive(Debug, Error)]
pub enum PlaceOrderError {
    /// Request failed input validation.
    #[error("invalid order: {0}")]
    Invalid(String),

    /// The movie does not exist.
    #[error("movie not found: {0}")]
    NotFound(i64),

    /// Not enough stock, either at the pre-check or at the store's re-check.
    #[error("insufficient stock for movie {movie_id}: requested {requested}")]
    InsufficientStock { movie_id: i64, requested: i64 },

    /// The inventory service could not be reached or answered unexpectedly.
    #[error("inventory unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The purchase message could not be published. Stock may already be reserved.
    #[error("queue unavailable: {0}")]
    QueueUnavailable(String),
}

impl PlaceOrderError {
    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PlaceOrderError::Invalid(_) => "invalid",
            PlaceOrderError::NotFound(_) => "not_found",
            PlaceOrderError::InsufficientStock { .. } => "insufficient_stock",
            PlaceOrderError::UpstreamUnavailable(_) => "upstream_unavailable",
            PlaceOrderError::QueueUnavailable(_) => "queue_unavailable",
        }
    }
}

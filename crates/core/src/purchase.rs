//! Purchase messages: the fact of an accepted order, in flight on the queue.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::inventory::Movie;

/// Payload published by the gateway once stock has been reserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseMessage {
    pub user_id: i64,
    pub movie_id: i64,
    /// Title at the time of purchase.
    pub movie_title: String,
    pub quantity: i64,
    /// Unit price at the time of purchase.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Always `price * quantity`.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
}

impl PurchaseMessage {
    /// Snapshot the movie's title and price for `quantity` units.
    ///
    /// Returns `None` when the total does not fit in a `Decimal`.
    pub fn new(user_id: i64, movie: &Movie, quantity: i64) -> Option<Self> {
        Some(Self {
            user_id,
            movie_id: movie.id,
            movie_title: movie.title.clone(),
            quantity,
            price: movie.price,
            total_amount: line_total(movie.price, quantity)?,
        })
    }

    /// Serialize for publishing.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Parse a queue delivery body.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Check the invariants a persisted order relies on.
    pub fn check(&self) -> Result<(), String> {
        if self.quantity <= 0 {
            return Err(format!("quantity must be positive, got {}", self.quantity));
        }
        if self.price < Decimal::ZERO {
            return Err(format!("price cannot be negative, got {}", self.price));
        }
        let expected = line_total(self.price, self.quantity)
            .ok_or_else(|| format!("total for {} x {} overflows", self.quantity, self.price))?;
        // Float transport can add noise past the cent, so compare at 4 places.
        if expected.round_dp(4) != self.total_amount.round_dp(4) {
            return Err(format!(
                "total_amount {} does not match price {} x quantity {}",
                self.total_amount, self.price, self.quantity
            ));
        }
        Ok(())
    }
}

/// `price * quantity`, or `None` on overflow.
pub fn line_total(price: Decimal, quantity: i64) -> Option<Decimal> {
    price.checked_mul(Decimal::from(quantity))
}

/// A delivery that was quarantined instead of persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetter {
    pub reason: String,
    pub attempts: u32,
    pub dead_lettered_at: DateTime<Utc>,
    /// Original body, lossily decoded as UTF-8.
    pub body: String,
}

impl DeadLetter {
    pub fn new(reason: impl Into<String>, attempts: u32, body: &[u8]) -> Self {
        Self {
            reason: reason.into(),
            attempts,
            dead_lettered_at: Utc::now(),
            body: String::from_utf8_lossy(body).into_owned(),
        }
    }
}

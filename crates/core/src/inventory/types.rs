//! Movie records held by the inventory service.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A movie with its stock level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Unit price, serialized as a JSON number.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Units available. Never negative.
    pub stock: i64,
}

/// Fields required to create a movie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMovie {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub stock: i64,
}

impl NewMovie {
    /// Check price and stock are non-negative and the title is present.
    pub fn validate(&self) -> Result<(), InventoryError> {
        if self.title.trim().is_empty() {
            return Err(InventoryError::Invalid("title cannot be empty".to_string()));
        }
        validate_price(self.price)?;
        validate_stock(self.stock)
    }
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovieUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub stock: Option<i64>,
}

impl MovieUpdate {
    pub fn validate(&self) -> Result<(), InventoryError> {
        if let Some(ref title) = self.title {
            if title.trim().is_empty() {
                return Err(InventoryError::Invalid("title cannot be empty".to_string()));
            }
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        if let Some(stock) = self.stock {
            validate_stock(stock)?;
        }
        Ok(())
    }

    /// Apply this update to a movie in place.
    pub fn apply(self, movie: &mut Movie) {
        if let Some(title) = self.title {
            movie.title = title;
        }
        if let Some(description) = self.description {
            movie.description = description;
        }
        if let Some(price) = self.price {
            movie.price = price;
        }
        if let Some(stock) = self.stock {
            movie.stock = stock;
        }
    }
}

fn validate_price(price: Decimal) -> Result<(), InventoryError> {
    if price < Decimal::ZERO {
        return Err(InventoryError::Invalid(
            "price cannot be negative".to_string(),
        ));
    }
    Ok(())
}

fn validate_stock(stock: i64) -> Result<(), InventoryError> {
    if stock < 0 {
        return Err(InventoryError::Invalid(
            "stock cannot be negative".to_string(),
        ));
    }
    Ok(())
}

/// Errors from movie storage.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("Movie not found: {0}")]
    NotFound(i64),

    #[error("Insufficient stock for movie {movie_id}: requested {requested}, available {available}")]
    InsufficientStock {
        movie_id: i64,
        requested: i64,
        available: i64,
    },

    #[error("Invalid movie data: {0}")]
    Invalid(String),

    #[error("Database error: {0}")]
    Database(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_movie_price_serializes_as_number() {
        let movie = Movie {
            id: 1,
            title: "Alien".to_string(),
            description: String::new(),
            price: Decimal::new(1050, 2),
            stock: 3,
        };
        let value = serde_json::to_value(&movie).unwrap();
        assert_eq!(value["price"], json!(10.5));
        assert_eq!(value["stock"], 3);
    }

    #[test]
    fn test_new_movie_from_json_without_description() {
        let movie: NewMovie =
            serde_json::from_value(json!({"title": "Heat", "price": 9.99, "stock": 4})).unwrap();
        assert_eq!(movie.description, "");
        assert_eq!(movie.price, Decimal::new(999, 2));
        assert!(movie.validate().is_ok());
    }

    #[test]
    fn test_new_movie_rejects_negative_stock() {
        let movie = NewMovie {
            title: "Heat".to_string(),
            description: String::new(),
            price: Decimal::ONE,
            stock: -1,
        };
        assert!(matches!(movie.validate(), Err(InventoryError::Invalid(_))));
    }

    #[test]
    fn test_new_movie_rejects_negative_price() {
        let movie = NewMovie {
            title: "Heat".to_string(),
            description: String::new(),
            price: Decimal::new(-1, 0),
            stock: 1,
        };
        assert!(movie.validate().is_err());
    }

    #[test]
    fn test_update_applies_only_present_fields() {
        let mut movie = Movie {
            id: 7,
            title: "Old".to_string(),
            description: "keep".to_string(),
            price: Decimal::TEN,
            stock: 2,
        };
        let update: MovieUpdate = serde_json::from_value(json!({"title": "New", "stock": 9})).unwrap();
        assert!(update.validate().is_ok());
        update.apply(&mut movie);

        assert_eq!(movie.title, "New");
        assert_eq!(movie.description, "keep");
        assert_eq!(movie.price, Decimal::TEN);
        assert_eq!(movie.stock, 9);
    }
}

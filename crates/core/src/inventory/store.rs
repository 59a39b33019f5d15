//! Movie storage trait.

use super::{InventoryError, Movie, MovieUpdate, NewMovie};

/// Trait for movie storage backends.
///
/// `reduce_stock` is the only way stock goes down and must re-check
/// sufficiency atomically with the write.
pub trait MovieStore: Send + Sync {
    /// Create a new movie.
    fn create(&self, movie: NewMovie) -> Result<Movie, InventoryError>;

    /// Get a movie by ID.
    fn get(&self, id: i64) -> Result<Option<Movie>, InventoryError>;

    /// List all movies ordered by ID.
    fn list(&self) -> Result<Vec<Movie>, InventoryError>;

    /// Update a movie's fields.
    fn update(&self, id: i64, update: MovieUpdate) -> Result<Movie, InventoryError>;

    /// Delete a movie, returning the removed record.
    fn delete(&self, id: i64) -> Result<Movie, InventoryError>;

    /// Decrement stock by `quantity` if at least that much is available.
    fn reduce_stock(&self, id: i64, quantity: i64) -> Result<Movie, InventoryError>;

    /// Increment stock by `quantity` (compensation for a failed hand-off).
    fn restore_stock(&self, id: i64, quantity: i64) -> Result<Movie, InventoryError>;
}

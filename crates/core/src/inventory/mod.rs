//! Inventory: movies, their stock, and remote access to the inventory service.

mod client;
mod sqlite_store;
mod store;
mod types;

pub use client::{HttpInventoryClient, InventoryClient, InventoryClientError};
pub use sqlite_store::SqliteMovieStore;
pub use store::MovieStore;
pub use types::{InventoryError, Movie, MovieUpdate, NewMovie};

//! Mock inventory client for testing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::inventory::{InventoryClient, InventoryClientError, Movie};

/// A recorded call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryCall {
    GetMovie(i64),
    ReduceStock { movie_id: i64, quantity: i64 },
    RestoreStock { movie_id: i64, quantity: i64 },
}

#[derive(Debug, Default)]
struct MockInventoryState {
    movies: HashMap<i64, Movie>,
    /// Stock reported by `get_movie` instead of the real value.
    reported_stock: HashMap<i64, i64>,
    calls: Vec<InventoryCall>,
    get_error: Option<InventoryClientError>,
    reduce_error: Option<InventoryClientError>,
    restore_error: Option<InventoryClientError>,
}

/// Mock implementation of the InventoryClient trait.
///
/// Holds movies in memory and applies stock changes with the same
/// conditional-decrement rule as the real store:
/// - Track calls for assertions
/// - Report stale stock from `get_movie` to exercise the store's re-check
/// - Simulate failures per operation
#[derive(Debug, Clone, Default)]
pub struct MockInventoryClient {
    state: Arc<Mutex<MockInventoryState>>,
}

impl MockInventoryClient {
    /// Create an empty mock inventory.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockInventoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add or replace a movie.
    pub fn insert(&self, movie: Movie) {
        self.lock().movies.insert(movie.id, movie);
    }

    /// Overwrite a movie's stock.
    pub fn set_stock(&self, movie_id: i64, stock: i64) {
        if let Some(movie) = self.lock().movies.get_mut(&movie_id) {
            movie.stock = stock;
        }
    }

    /// Current stock, if the movie exists.
    pub fn stock(&self, movie_id: i64) -> Option<i64> {
        self.lock().movies.get(&movie_id).map(|m| m.stock)
    }

    /// Make `get_movie` report `stock` regardless of the real value (`None` clears it).
    pub fn set_reported_stock(&self, movie_id: i64, stock: Option<i64>) {
        let mut state = self.lock();
        match stock {
            Some(stock) => state.reported_stock.insert(movie_id, stock),
            None => state.reported_stock.remove(&movie_id),
        };
    }

    /// Fail every `get_movie` call with `error`.
    pub fn fail_get_movie(&self, error: InventoryClientError) {
        self.lock().get_error = Some(error);
    }

    /// Fail every `reduce_stock` call with `error`.
    pub fn fail_reduce_stock(&self, error: InventoryClientError) {
        self.lock().reduce_error = Some(error);
    }

    /// Fail every `restore_stock` call with `error`.
    pub fn fail_restore_stock(&self, error: InventoryClientError) {
        self.lock().restore_error = Some(error);
    }

    /// Get all recorded calls.
    pub fn calls(&self) -> Vec<InventoryCall> {
        self.lock().calls.clone()
    }
}

#[async_trait]
impl InventoryClient for MockInventoryClient {
    async fn get_movie(&self, id: i64) -> Result<Movie, InventoryClientError> {
        let mut state = self.lock();
        state.calls.push(InventoryCall::GetMovie(id));

        if let Some(error) = &state.get_error {
            return Err(error.clone());
        }

        let mut movie = state
            .movies
            .get(&id)
            .cloned()
            .ok_or(InventoryClientError::NotFound(id))?;
        if let Some(stock) = state.reported_stock.get(&id) {
            movie.stock = *stock;
        }
        Ok(movie)
    }

    async fn reduce_stock(&self, id: i64, quantity: i64) -> Result<Movie, InventoryClientError> {
        let mut state = self.lock();
        state.calls.push(InventoryCall::ReduceStock {
            movie_id: id,
            quantity,
        });

        if let Some(error) = &state.reduce_error {
            return Err(error.clone());
        }

        let movie = state
            .movies
            .get_mut(&id)
            .ok_or(InventoryClientError::NotFound(id))?;
        if movie.stock < quantity {
            return Err(InventoryClientError::InsufficientStock(id));
        }
        movie.stock -= quantity;
        Ok(movie.clone())
    }

    async fn restore_stock(&self, id: i64, quantity: i64) -> Result<Movie, InventoryClientError> {
        let mut state = self.lock();
        state.calls.push(InventoryCall::RestoreStock {
            movie_id: id,
            quantity,
        });

        if let Some(error) = &state.restore_error {
            return Err(error.clone());
        }

        let movie = state
            .movies
            .get_mut(&id)
            .ok_or(InventoryClientError::NotFound(id))?;
        movie.stock += quantity;
        Ok(movie.clone())
    }
}

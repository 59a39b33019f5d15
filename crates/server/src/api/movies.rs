//! Inventory API handlers.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use boxoffice_core::{InventoryError, Movie, MovieUpdate, NewMovie};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

use super::handlers::{error_response, path_id, ApiError, MessageResponse};
use crate::state::InventoryState;

const REQUIRED_FIELDS: [&str; 3] = ["title", "price", "stock"];

/// Body for stock adjustments
#[derive(Debug, Deserialize)]
pub struct QuantityBody {
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

fn map_error(e: InventoryError) -> ApiError {
    match e {
        InventoryError::NotFound(_) => error_response(StatusCode::NOT_FOUND, "Movie not found"),
        InventoryError::InsufficientStock { .. } => {
            error_response(StatusCode::BAD_REQUEST, "Insufficient stock")
        }
        InventoryError::Invalid(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
        InventoryError::Database(msg) => {
            error!("Inventory database error: {}", msg);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

fn invalid_body(rejection: JsonRejection) -> ApiError {
    error_response(
        StatusCode::BAD_REQUEST,
        &format!("Invalid request body: {}", rejection.body_text()),
    )
}

/// List every movie
pub async fn list_movies(
    State(state): State<Arc<InventoryState>>,
) -> Result<Json<Vec<Movie>>, ApiError> {
    state.store().list().map(Json).map_err(map_error)
}

/// Get a movie by ID
pub async fn get_movie(
    State(state): State<Arc<InventoryState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Movie>, ApiError> {
    let id = path_id(id, "Movie not found")?;
    match state.store().get(id) {
        Ok(Some(movie)) => Ok(Json(movie)),
        Ok(None) => Err(error_response(StatusCode::NOT_FOUND, "Movie not found")),
        Err(e) => Err(map_error(e)),
    }
}

/// Create a movie; `title`, `price` and `stock` are required
pub async fn create_movie(
    State(state): State<Arc<InventoryState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Movie>), ApiError> {
    let missing = || error_response(StatusCode::BAD_REQUEST, "Missing required fields");

    let Ok(Json(body)) = payload else {
        return Err(missing());
    };
    if !REQUIRED_FIELDS.iter().all(|field| body.get(field).is_some()) {
        return Err(missing());
    }

    let new_movie: NewMovie = serde_json::from_value(body).map_err(|e| {
        error_response(
            StatusCode::BAD_REQUEST,
            &format!("Invalid movie data: {}", e),
        )
    })?;
    new_movie.validate().map_err(map_error)?;

    let movie = state.store().create(new_movie).map_err(map_error)?;
    info!(movie_id = movie.id, title = %movie.title, stock = movie.stock, "Movie created");
    Ok((StatusCode::CREATED, Json(movie)))
}

/// Update any subset of a movie's fields
pub async fn update_movie(
    State(state): State<Arc<InventoryState>>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<MovieUpdate>, JsonRejection>,
) -> Result<Json<Movie>, ApiError> {
    let id = path_id(id, "Movie not found")?;
    let Json(update) = payload.map_err(invalid_body)?;
    state.store().update(id, update).map(Json).map_err(map_error)
}

pub async fn delete_movie(
    State(state): State<Arc<InventoryState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = path_id(id, "Movie not found")?;
    let movie = state.store().delete(id).map_err(map_error)?;
    info!(movie_id = movie.id, "Movie deleted");
    Ok(Json(MessageResponse {
        message: "Movie deleted successfully".to_string(),
    }))
}

/// Decrement stock if enough is available; the check and the write are one statement
pub async fn reduce_stock(
    State(state): State<Arc<InventoryState>>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<QuantityBody>, JsonRejection>,
) -> Result<Json<Movie>, ApiError> {
    let id = path_id(id, "Movie not found")?;
    let Json(body) = payload.map_err(invalid_body)?;
    state
        .store()
        .reduce_stock(id, body.quantity)
        .map(Json)
        .map_err(map_error)
}

/// Give stock back after a purchase could not be handed off
pub async fn restore_stock(
    State(state): State<Arc<InventoryState>>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<QuantityBody>, JsonRejection>,
) -> Result<Json<Movie>, ApiError> {
    let id = path_id(id, "Movie not found")?;
    let Json(body) = payload.map_err(invalid_body)?;
    let movie = state
        .store()
        .restore_stock(id, body.quantity)
        .map_err(map_error)?;
    info!(movie_id = id, quantity = body.quantity, "Stock restored");
    Ok(Json(movie))
}

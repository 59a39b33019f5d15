//! SQLite-backed movie store implementation.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, types::Type, Connection, OptionalExtension};
use rust_decimal::Decimal;

use super::{InventoryError, Movie, MovieStore, MovieUpdate, NewMovie};

const SELECT_MOVIE: &str = "SELECT id, title, description, price, stock FROM movies";

/// SQLite-backed movie store.
pub struct SqliteMovieStore {
    conn: Mutex<Connection>,
}

impl SqliteMovieStore {
    /// Create a new SQLite movie store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, InventoryError> {
        let conn = Connection::open(path).map_err(db_error)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite movie store (useful for testing).
    pub fn in_memory() -> Result<Self, InventoryError> {
        let conn = Connection::open_in_memory().map_err(db_error)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), InventoryError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS movies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                price TEXT NOT NULL,
                stock INTEGER NOT NULL DEFAULT 0 CHECK (stock >= 0)
            );
            "#,
        )
        .map_err(db_error)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, InventoryError> {
        self.conn
            .lock()
            .map_err(|_| InventoryError::Database("connection lock poisoned".to_string()))
    }

    fn row_to_movie(row: &rusqlite::Row) -> rusqlite::Result<Movie> {
        let price_str: String = row.get(3)?;
        let price = Decimal::from_str(&price_str)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

        Ok(Movie {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            price,
            stock: row.get(4)?,
        })
    }

    fn fetch(conn: &Connection, id: i64) -> Result<Option<Movie>, InventoryError> {
        conn.query_row(
            &format!("{} WHERE id = ?", SELECT_MOVIE),
            params![id],
            Self::row_to_movie,
        )
        .optional()
        .map_err(db_error)
    }

    fn fetch_existing(conn: &Connection, id: i64) -> Result<Movie, InventoryError> {
        Self::fetch(conn, id)?.ok_or(InventoryError::NotFound(id))
    }
}

fn db_error(e: rusqlite::Error) -> InventoryError {
    InventoryError::Database(e.to_string())
}

fn positive_quantity(quantity: i64) -> Result<(), InventoryError> {
    if quantity <= 0 {
        return Err(InventoryError::Invalid(
            "quantity must be a positive integer".to_string(),
        ));
    }
    Ok(())
}

impl MovieStore for SqliteMovieStore {
    fn create(&self, movie: NewMovie) -> Result<Movie, InventoryError> {
        movie.validate()?;
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO movies (title, description, price, stock) VALUES (?, ?, ?, ?)",
            params![
                movie.title,
                movie.description,
                movie.price.to_string(),
                movie.stock
            ],
        )
        .map_err(db_error)?;

        Ok(Movie {
            id: conn.last_insert_rowid(),
            title: movie.title,
            description: movie.description,
            price: movie.price,
            stock: movie.stock,
        })
    }

    fn get(&self, id: i64) -> Result<Option<Movie>, InventoryError> {
        let conn = self.conn()?;
        Self::fetch(&conn, id)
    }

    fn list(&self) -> Result<Vec<Movie>, InventoryError> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare(&format!("{} ORDER BY id ASC", SELECT_MOVIE))
            .map_err(db_error)?;

        let rows = stmt.query_map([], Self::row_to_movie).map_err(db_error)?;

        let mut movies = Vec::new();
        for row_result in rows {
            movies.push(row_result.map_err(db_error)?);
        }

        Ok(movies)
    }

    fn update(&self, id: i64, update: MovieUpdate) -> Result<Movie, InventoryError> {
        update.validate()?;
        let conn = self.conn()?;

        let mut movie = Self::fetch_existing(&conn, id)?;
        update.apply(&mut movie);

        conn.execute(
            "UPDATE movies SET title = ?, description = ?, price = ?, stock = ? WHERE id = ?",
            params![
                movie.title,
                movie.description,
                movie.price.to_string(),
                movie.stock,
                id
            ],
        )
        .map_err(db_error)?;

        Ok(movie)
    }

    fn delete(&self, id: i64) -> Result<Movie, InventoryError> {
        let conn = self.conn()?;

        let movie = Self::fetch_existing(&conn, id)?;
        conn.execute("DELETE FROM movies WHERE id = ?", params![id])
            .map_err(db_error)?;

        Ok(movie)
    }

    fn reduce_stock(&self, id: i64, quantity: i64) -> Result<Movie, InventoryError> {
        positive_quantity(quantity)?;
        let conn = self.conn()?;

        // The sufficiency check lives in the WHERE clause so concurrent
        // writers on the same file cannot drive stock below zero.
        let changed = conn
            .execute(
                "UPDATE movies SET stock = stock - ?1 WHERE id = ?2 AND stock >= ?1",
                params![quantity, id],
            )
            .map_err(db_error)?;

        if changed == 0 {
            let movie = Self::fetch_existing(&conn, id)?;
            return Err(InventoryError::InsufficientStock {
                movie_id: id,
                requested: quantity,
                available: movie.stock,
            });
        }

        Self::fetch_existing(&conn, id)
    }

    fn restore_stock(&self, id: i64, quantity: i64) -> Result<Movie, InventoryError> {
        positive_quantity(quantity)?;
        let conn = self.conn()?;

        let changed = conn
            .execute(
                "UPDATE movies SET stock = stock + ?1 WHERE id = ?2",
                params![quantity, id],
            )
            .map_err(db_error)?;

        if changed == 0 {
            return Err(InventoryError::NotFound(id));
        }

        Self::fetch_existing(&conn, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn new_movie(title: &str, price: Decimal, stock: i64) -> NewMovie {
        NewMovie {
            title: title.to_string(),
            description: format!("{} description", title),
            price,
            stock,
        }
    }

    #[test]
    fn test_create_and_get() {
        let store = SqliteMovieStore::in_memory().unwrap();
        let created = store
            .create(new_movie("Alien", Decimal::new(1999, 2), 5))
            .unwrap();

        let fetched = store.get(created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.price, Decimal::new(1999, 2));
    }

    #[test]
    fn test_get_missing_returns_none() {
        let store = SqliteMovieStore::in_memory().unwrap();
        assert!(store.get(42).unwrap().is_none());
    }

    #[test]
    fn test_create_rejects_negative_stock() {
        let store = SqliteMovieStore::in_memory().unwrap();
        let result = store.create(new_movie("Alien", Decimal::ONE, -3));
        assert!(matches!(result, Err(InventoryError::Invalid(_))));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_list_orders_by_id() {
        let store = SqliteMovieStore::in_memory().unwrap();
        store.create(new_movie("A", Decimal::ONE, 1)).unwrap();
        store.create(new_movie("B", Decimal::ONE, 1)).unwrap();

        let movies = store.list().unwrap();
        assert_eq!(movies.len(), 2);
        assert_eq!(movies[0].title, "A");
        assert_eq!(movies[1].title, "B");
    }

    #[test]
    fn test_update_partial() {
        let store = SqliteMovieStore::in_memory().unwrap();
        let movie = store.create(new_movie("Alien", Decimal::TEN, 5)).unwrap();

        let updated = store
            .update(
                movie.id,
                MovieUpdate {
                    price: Some(Decimal::new(1250, 2)),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.title, "Alien");
        assert_eq!(updated.price, Decimal::new(1250, 2));
        assert_eq!(store.get(movie.id).unwrap().unwrap(), updated);
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let store = SqliteMovieStore::in_memory().unwrap();
        let result = store.update(9, MovieUpdate::default());
        assert!(matches!(result, Err(InventoryError::NotFound(9))));
    }

    #[test]
    fn test_delete() {
        let store = SqliteMovieStore::in_memory().unwrap();
        let movie = store.create(new_movie("Alien", Decimal::TEN, 5)).unwrap();

        let deleted = store.delete(movie.id).unwrap();
        assert_eq!(deleted.id, movie.id);
        assert!(store.get(movie.id).unwrap().is_none());
        assert!(matches!(
            store.delete(movie.id),
            Err(InventoryError::NotFound(_))
        ));
    }

    #[test]
    fn test_reduce_stock() {
        let store = SqliteMovieStore::in_memory().unwrap();
        let movie = store.create(new_movie("Alien", Decimal::TEN, 5)).unwrap();

        let updated = store.reduce_stock(movie.id, 3).unwrap();
        assert_eq!(updated.stock, 2);
    }

    #[test]
    fn test_reduce_stock_to_zero() {
        let store = SqliteMovieStore::in_memory().unwrap();
        let movie = store.create(new_movie("Alien", Decimal::TEN, 2)).unwrap();

        assert_eq!(store.reduce_stock(movie.id, 2).unwrap().stock, 0);
    }

    #[test]
    fn test_reduce_stock_insufficient_leaves_stock_unchanged() {
        let store = SqliteMovieStore::in_memory().unwrap();
        let movie = store.create(new_movie("Alien", Decimal::TEN, 1)).unwrap();

        let result = store.reduce_stock(movie.id, 2);
        assert!(matches!(
            result,
            Err(InventoryError::InsufficientStock {
                requested: 2,
                available: 1,
                ..
            })
        ));
        assert_eq!(store.get(movie.id).unwrap().unwrap().stock, 1);
    }

    #[test]
    fn test_reduce_stock_missing_movie() {
        let store = SqliteMovieStore::in_memory().unwrap();
        assert!(matches!(
            store.reduce_stock(5, 1),
            Err(InventoryError::NotFound(5))
        ));
    }

    #[test]
    fn test_reduce_stock_rejects_non_positive_quantity() {
        let store = SqliteMovieStore::in_memory().unwrap();
        let movie = store.create(new_movie("Alien", Decimal::TEN, 1)).unwrap();
        assert!(matches!(
            store.reduce_stock(movie.id, 0),
            Err(InventoryError::Invalid(_))
        ));
        assert!(matches!(
            store.reduce_stock(movie.id, -4),
            Err(InventoryError::Invalid(_))
        ));
    }

    #[test]
    fn test_restore_stock() {
        let store = SqliteMovieStore::in_memory().unwrap();
        let movie = store.create(new_movie("Alien", Decimal::TEN, 1)).unwrap();
        store.reduce_stock(movie.id, 1).unwrap();

        assert_eq!(store.restore_stock(movie.id, 1).unwrap().stock, 1);
        assert!(matches!(
            store.restore_stock(99, 1),
            Err(InventoryError::NotFound(99))
        ));
    }

    #[test]
    fn test_concurrent_reductions_never_oversell() {
        let store = Arc::new(SqliteMovieStore::in_memory().unwrap());
        let movie = store.create(new_movie("Alien", Decimal::TEN, 10)).unwrap();

        let handles: Vec<_> = (0..25)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.reduce_stock(movie.id, 1).is_ok())
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(successes, 10);
        assert_eq!(store.get(movie.id).unwrap().unwrap().stock, 0);
    }

    #[test]
    fn test_persists_across_reopen() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("inventory.db");

        let id = {
            let store = SqliteMovieStore::new(&db_path).unwrap();
            store.create(new_movie("Alien", Decimal::TEN, 4)).unwrap().id
        };

        let store = SqliteMovieStore::new(&db_path).unwrap();
        assert_eq!(store.get(id).unwrap().unwrap().stock, 4);
    }
}

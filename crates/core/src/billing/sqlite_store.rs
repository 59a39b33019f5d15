//! SQLite-backed order store implementation.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, types::Type, Connection, OptionalExtension};
use rust_decimal::Decimal;

use super::{NewOrder, Order, OrderError, OrderFilter, OrderStatus, OrderStore};

const SELECT_ORDER: &str = "SELECT id, user_id, movie_id, movie_title, quantity, price, total_amount, status, created_at, updated_at FROM orders";

/// SQLite-backed order store.
pub struct SqliteOrderStore {
    conn: Mutex<Connection>,
}

impl SqliteOrderStore {
    /// Create a new SQLite order store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, OrderError> {
        let conn = Connection::open(path).map_err(db_error)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite order store (useful for testing).
    pub fn in_memory() -> Result<Self, OrderError> {
        let conn = Connection::open_in_memory().map_err(db_error)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), OrderError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS orders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                movie_id INTEGER NOT NULL,
                movie_title TEXT NOT NULL,
                quantity INTEGER NOT NULL DEFAULT 1,
                price TEXT NOT NULL,
                total_amount TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_orders_user_id ON orders(user_id);
            "#,
        )
        .map_err(db_error)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, OrderError> {
        self.conn
            .lock()
            .map_err(|_| OrderError::Database("connection lock poisoned".to_string()))
    }

    fn build_where_clause(filter: &OrderFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(user_id) = filter.user_id {
            conditions.push("user_id = ?");
            params.push(Box::new(user_id));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    fn row_to_order(row: &rusqlite::Row) -> rusqlite::Result<Order> {
        let price = parse_column(row, 5, |s| Decimal::from_str(s))?;
        let total_amount = parse_column(row, 6, |s| Decimal::from_str(s))?;
        let status = parse_column(row, 7, |s| {
            OrderStatus::from_str(s).map_err(std::io::Error::other)
        })?;
        let created_at = parse_column(row, 8, parse_timestamp)?;
        let updated_at = parse_column(row, 9, parse_timestamp)?;

        Ok(Order {
            id: row.get(0)?,
            user_id: row.get(1)?,
            movie_id: row.get(2)?,
            movie_title: row.get(3)?,
            quantity: row.get(4)?,
            price,
            total_amount,
            status,
            created_at,
            updated_at,
        })
    }

    fn fetch(conn: &Connection, id: i64) -> Result<Option<Order>, OrderError> {
        conn.query_row(
            &format!("{} WHERE id = ?", SELECT_ORDER),
            params![id],
            Self::row_to_order,
        )
        .optional()
        .map_err(db_error)
    }
}

fn db_error(e: rusqlite::Error) -> OrderError {
    OrderError::Database(e.to_string())
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

/// Read a TEXT column and parse it, reporting failures as conversion errors.
fn parse_column<T, E, F>(row: &rusqlite::Row, idx: usize, parse: F) -> rusqlite::Result<T>
where
    F: FnOnce(&str) -> Result<T, E>,
    E: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    parse(&raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

impl OrderStore for SqliteOrderStore {
    fn create(&self, order: NewOrder) -> Result<Order, OrderError> {
        let conn = self.conn()?;
        let now = Utc::now();

        conn.execute(
            "INSERT INTO orders (user_id, movie_id, movie_title, quantity, price, total_amount, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                order.user_id,
                order.movie_id,
                order.movie_title,
                order.quantity,
                order.price.to_string(),
                order.total_amount.to_string(),
                order.status.as_str(),
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )
        .map_err(db_error)?;

        Ok(Order {
            id: conn.last_insert_rowid(),
            user_id: order.user_id,
            movie_id: order.movie_id,
            movie_title: order.movie_title,
            quantity: order.quantity,
            price: order.price,
            total_amount: order.total_amount,
            status: order.status,
            created_at: now,
            updated_at: now,
        })
    }

    fn get(&self, id: i64) -> Result<Option<Order>, OrderError> {
        let conn = self.conn()?;
        Self::fetch(&conn, id)
    }

    fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, OrderError> {
        let conn = self.conn()?;

        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!(
            "{} {} ORDER BY id ASC LIMIT ? OFFSET ?",
            SELECT_ORDER, where_clause
        );

        let mut stmt = conn.prepare(&sql).map_err(db_error)?;

        let mut all_params: Vec<Box<dyn rusqlite::ToSql>> = params;
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));

        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), Self::row_to_order)
            .map_err(db_error)?;

        let mut orders = Vec::new();
        for row_result in rows {
            orders.push(row_result.map_err(db_error)?);
        }

        Ok(orders)
    }

    fn count(&self, filter: &OrderFilter) -> Result<i64, OrderError> {
        let conn = self.conn()?;

        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM orders {}", where_clause);
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(db_error)
    }

    fn update_status(&self, id: i64, status: OrderStatus) -> Result<Order, OrderError> {
        let conn = self.conn()?;

        let changed = conn
            .execute(
                "UPDATE orders SET status = ?, updated_at = ? WHERE id = ?",
                params![status.as_str(), Utc::now().to_rfc3339(), id],
            )
            .map_err(db_error)?;

        if changed == 0 {
            return Err(OrderError::NotFound(id));
        }

        Self::fetch(&conn, id)?.ok_or(OrderError::NotFound(id))
    }
}

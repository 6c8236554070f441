//! Durable chat → saved-city associations.
//!
//! The pair (user_id, city_name) is unique; the SQLite implementation lets the
//! storage engine enforce that with a table constraint, so concurrent handlers
//! cannot insert the same pair twice.

use std::{
    path::Path,
    sync::{Mutex, MutexGuard},
};

use rusqlite::{params, Connection, OpenFlags};
use tracing::{debug, info};

use crate::{domain::ChatId, errors::Error, Result};

/// Hexagonal port for the favorite-city list.
pub trait CityStore: Send + Sync {
    /// Insert the pair if absent. `Ok(false)` means it was already saved.
    fn add_city(&self, user_id: ChatId, city_name: &str) -> Result<bool>;

    /// All city names saved by `user_id`. No ordering guarantee.
    fn select_cities(&self, user_id: ChatId) -> Result<Vec<String>>;
}

pub struct SqliteCityStore {
    conn: Mutex<Connection>,
}

impl SqliteCityStore {
    /// Create or open the store at `path`, initialising the schema if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Opening city store");

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cities (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                city_name TEXT NOT NULL,
                UNIQUE (user_id, city_name)
            );

            CREATE INDEX IF NOT EXISTS idx_cities_user_id ON cities(user_id);
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::External("city store mutex poisoned".to_string()))
    }
}

impl CityStore for SqliteCityStore {
    fn add_city(&self, user_id: ChatId, city_name: &str) -> Result<bool> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO cities (user_id, city_name) VALUES (?1, ?2)",
            params![user_id.0, city_name],
        )?;

        debug!(
            user_id = user_id.0,
            city = city_name,
            inserted = inserted > 0,
            "add_city"
        );
        Ok(inserted > 0)
    }

    fn select_cities(&self, user_id: ChatId) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT city_name FROM cities WHERE user_id = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![user_id.0], |row| row.get::<_, String>(0))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

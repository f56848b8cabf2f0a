//! Database connection management.
//!
//! A single rusqlite Connection behind a Mutex. WAL mode and foreign keys
//! are enabled on open, then pending migrations are applied.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, Transaction};
use tracing::info;

use ieum_core::error::IeumError;

use crate::migrations;

/// Thread-safe SQLite database wrapper.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a database at the given path and migrate it.
    pub fn new(path: &Path) -> Result<Self, IeumError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| IeumError::Storage(format!("Failed to open database: {}", e)))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )
        .map_err(|e| IeumError::Storage(format!("Failed to set pragmas: {}", e)))?;

        info!(path = %path.display(), "Database opened");

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.with_conn(migrations::run_migrations)?;
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, IeumError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| IeumError::Storage(format!("Failed to open in-memory db: {}", e)))?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| IeumError::Storage(format!("Failed to set pragmas: {}", e)))?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.with_conn(migrations::run_migrations)?;
        Ok(db)
    }

    /// Execute a closure with the underlying connection. The mutex is held
    /// for the duration of the closure.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, IeumError>
    where
        F: FnOnce(&Connection) -> Result<T, IeumError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| IeumError::Storage(format!("Database lock poisoned: {}", e)))?;
        f(&conn)
    }

    /// Execute a closure inside a transaction.
    ///
    /// Commits when the closure returns `Ok`; any error rolls every write
    /// in the closure back.
    pub fn with_transaction<F, T>(&self, f: F) -> Result<T, IeumError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, IeumError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| IeumError::Storage(format!("Database lock poisoned: {}", e)))?;
        let tx = conn
            .transaction()
            .map_err(|e| IeumError::Storage(format!("Failed to begin transaction: {}", e)))?;
        let value = f(&tx)?;
        tx.commit()
            .map_err(|e| IeumError::Storage(format!("Failed to commit transaction: {}", e)))?;
        Ok(value)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_messages(db: &Database) -> i64 {
        db.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
                .map_err(|e| IeumError::Storage(e.to_string()))
        })
        .unwrap()
    }

    fn insert_elderly(conn: &Connection, id: &str) -> Result<(), IeumError> {
        conn.execute(
            "INSERT INTO elderly (id, name, gender, report_day) VALUES (?1, 'kim', 'MALE', 0)",
            [id],
        )
        .map_err(|e| IeumError::Storage(e.to_string()))?;
        Ok(())
    }

    #[test]
    fn test_in_memory_database() {
        let db = Database::in_memory().unwrap();
        assert_eq!(count_messages(&db), 0);
    }

    #[test]
    fn test_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ieum.db");
        let db = Database::new(&path).unwrap();
        assert_eq!(count_messages(&db), 0);
        assert!(path.exists());
    }

    #[test]
    fn test_transaction_commits_on_ok() {
        let db = Database::in_memory().unwrap();
        db.with_transaction(|tx| insert_elderly(tx, "e-1")).unwrap();

        let count: i64 = db
            .with_conn(|conn| {
                conn.query_row("SELECT COUNT(*) FROM elderly", [], |row| row.get(0))
                    .map_err(|e| IeumError::Storage(e.to_string()))
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let db = Database::in_memory().unwrap();
        let result: Result<(), IeumError> = db.with_transaction(|tx| {
            insert_elderly(tx, "e-1")?;
            Err(IeumError::Storage("boom".to_string()))
        });
        assert!(result.is_err());

        let count: i64 = db
            .with_conn(|conn| {
                conn.query_row("SELECT COUNT(*) FROM elderly", [], |row| row.get(0))
                    .map_err(|e| IeumError::Storage(e.to_string()))
            })
            .unwrap();
        assert_eq!(count, 0);
    }
}

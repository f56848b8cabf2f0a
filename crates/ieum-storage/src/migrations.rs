//! Database schema migrations.
//!
//! Version 1 creates the elderly, assistants, messages and reports tables.
//! All timestamps are epoch milliseconds.

use rusqlite::Connection;
use tracing::info;

use ieum_core::error::IeumError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), IeumError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| IeumError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| IeumError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

fn apply_v1(conn: &Connection) -> Result<(), IeumError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS assistants (
            id                      TEXT PRIMARY KEY NOT NULL,
            name                    TEXT NOT NULL,
            personality             TEXT NOT NULL DEFAULT '',
            thread_handle           TEXT,
            external_assistant_id   TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS elderly (
            id              TEXT PRIMARY KEY NOT NULL,
            name            TEXT NOT NULL,
            gender          TEXT NOT NULL CHECK (gender IN ('MALE', 'FEMALE')),
            assistant_id    TEXT UNIQUE REFERENCES assistants(id) ON DELETE SET NULL,
            last_chat_at    INTEGER,
            report_day      INTEGER NOT NULL CHECK (report_day BETWEEN 0 AND 6)
        );

        CREATE TABLE IF NOT EXISTS messages (
            id              TEXT PRIMARY KEY NOT NULL,
            elderly_id      TEXT NOT NULL REFERENCES elderly(id) ON DELETE CASCADE,
            content         TEXT NOT NULL,
            message_type    TEXT NOT NULL CHECK (message_type IN ('USER', 'AI')),
            created_at      INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_elderly_created
            ON messages (elderly_id, created_at DESC);

        CREATE TABLE IF NOT EXISTS reports (
            id                  TEXT PRIMARY KEY NOT NULL,
            elderly_id          TEXT NOT NULL REFERENCES elderly(id) ON DELETE CASCADE,
            report_type         TEXT NOT NULL CHECK (report_type IN ('WEEKLY', 'MONTHLY')),
            status              TEXT NOT NULL DEFAULT 'PENDING'
                                CHECK (status IN ('PENDING', 'COMPLETE')),
            start_date          INTEGER NOT NULL,
            indicators          TEXT NOT NULL DEFAULT '{}',
            qualitative_summary TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_reports_elderly
            ON reports (elderly_id, start_date DESC);

        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| IeumError::Storage(format!("Failed to apply migration v1: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        conn
    }

    #[test]
    fn test_migrations_run_once() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn test_message_requires_existing_elderly() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO messages (id, elderly_id, content, message_type, created_at)
             VALUES ('m-1', 'missing', 'hi', 'USER', 0)",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_message_type_check() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();
        conn.execute(
            "INSERT INTO elderly (id, name, gender, report_day) VALUES ('e-1', 'kim', 'FEMALE', 2)",
            [],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO messages (id, elderly_id, content, message_type, created_at)
             VALUES ('m-1', 'e-1', 'hi', 'SYSTEM', 0)",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_assistant_is_one_to_one_with_elderly() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();
        conn.execute(
            "INSERT INTO assistants (id, name, external_assistant_id) VALUES ('a-1', 'bom', 'asst_1')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO elderly (id, name, gender, assistant_id, report_day)
             VALUES ('e-1', 'kim', 'MALE', 'a-1', 0)",
            [],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO elderly (id, name, gender, assistant_id, report_day)
             VALUES ('e-2', 'lee', 'MALE', 'a-1', 0)",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_report_status_defaults_to_pending() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();
        conn.execute(
            "INSERT INTO elderly (id, name, gender, report_day) VALUES ('e-1', 'kim', 'MALE', 0)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO reports (id, elderly_id, report_type, start_date)
             VALUES ('r-1', 'e-1', 'WEEKLY', 0)",
            [],
        )
        .unwrap();

        let status: String = conn
            .query_row("SELECT status FROM reports WHERE id = 'r-1'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(status, "PENDING");
    }
}

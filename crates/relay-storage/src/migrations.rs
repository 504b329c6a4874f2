//! Database schema migrations.
//!
//! Applies the initial schema: the conversation `messages` table, the
//! crawler's `workflows` table, and the schema_migrations tracking table.

use rusqlite::Connection;
use tracing::info;

use relay_core::error::RelayError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), RelayError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| RelayError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| RelayError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<(), RelayError> {
    conn.execute_batch(
        "
        -- Conversation turns. `message` holds the {type, content, data?} document.
        CREATE TABLE IF NOT EXISTS messages (
            id          TEXT PRIMARY KEY NOT NULL,
            session_id  TEXT NOT NULL,
            message     TEXT NOT NULL,
            created_at  INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_session_created
            ON messages (session_id, created_at DESC);

        -- Crawled workflow templates.
        CREATE TABLE IF NOT EXISTS workflows (
            workflow_id             INTEGER PRIMARY KEY NOT NULL,
            workflow_name           TEXT NOT NULL,
            workflow_description    TEXT NOT NULL DEFAULT '',
            workflow_json           TEXT NOT NULL,
            n8n_demo                TEXT NOT NULL,
            summary_accomplishment  TEXT NOT NULL,
            summary_nodes           TEXT NOT NULL,
            summary_suggestions     TEXT NOT NULL,
            embedding               TEXT NOT NULL,
            content                 TEXT NOT NULL,
            metadata                TEXT NOT NULL DEFAULT '{}',
            created_at              INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        INSERT INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| RelayError::Storage(format!("Migration v1 failed: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let applied: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(applied, 1);
    }

    #[test]
    fn test_session_index_exists() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master
                 WHERE type = 'index' AND name = 'idx_messages_session_created'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }
}

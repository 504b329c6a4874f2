//! Repository for crawled workflow templates.

use std::sync::Arc;

use relay_core::error::RelayError;
use relay_core::types::CatalogEntry;

use crate::db::Database;

/// Repository for the `workflows` table.
pub struct CatalogRepository {
    db: Arc<Database>,
}

impl CatalogRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert an entry, replacing any row already stored for its ID.
    pub fn upsert(&self, entry: &CatalogEntry) -> Result<(), RelayError> {
        let embedding = serde_json::to_string(&entry.embedding)?;
        let metadata = serde_json::to_string(&entry.metadata)?;

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO workflows (
                    workflow_id, workflow_name, workflow_description, workflow_json,
                    n8n_demo, summary_accomplishment, summary_nodes, summary_suggestions,
                    embedding, content, metadata
                 )
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT (workflow_id) DO UPDATE SET
                    workflow_name = excluded.workflow_name,
                    workflow_description = excluded.workflow_description,
                    workflow_json = excluded.workflow_json,
                    n8n_demo = excluded.n8n_demo,
                    summary_accomplishment = excluded.summary_accomplishment,
                    summary_nodes = excluded.summary_nodes,
                    summary_suggestions = excluded.summary_suggestions,
                    embedding = excluded.embedding,
                    content = excluded.content,
                    metadata = excluded.metadata",
                rusqlite::params![
                    entry.workflow_id as i64,
                    entry.workflow_name,
                    entry.workflow_description,
                    entry.workflow_json,
                    entry.n8n_demo,
                    entry.summary_accomplishment,
                    entry.summary_nodes,
                    entry.summary_suggestions,
                    embedding,
                    entry.content,
                    metadata,
                ],
            )
            .map_err(|e| RelayError::Storage(format!("Failed to upsert workflow: {}", e)))?;
            Ok(())
        })
    }

    /// Find an entry by workflow ID.
    pub fn find_by_id(&self, workflow_id: u64) -> Result<Option<CatalogEntry>, RelayError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT workflow_id, workflow_name, workflow_description, workflow_json,
                            n8n_demo, summary_accomplishment, summary_nodes, summary_suggestions,
                            embedding, content, metadata
                     FROM workflows WHERE workflow_id = ?1",
                )
                .map_err(|e| RelayError::Storage(e.to_string()))?;

            let mut rows = stmt
                .query(rusqlite::params![workflow_id as i64])
                .map_err(|e| RelayError::Storage(e.to_string()))?;

            match rows.next().map_err(|e| RelayError::Storage(e.to_string()))? {
                Some(row) => Ok(Some(row_to_entry(row)?)),
                None => Ok(None),
            }
        })
    }

    /// Count stored entries.
    pub fn count(&self) -> Result<u64, RelayError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM workflows", [], |row| row.get(0))
                .map_err(|e| RelayError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> Result<CatalogEntry, RelayError> {
    let get_text = |idx: usize| -> Result<String, RelayError> {
        row.get(idx).map_err(|e| RelayError::Storage(e.to_string()))
    };

    let workflow_id: i64 = row
        .get(0)
        .map_err(|e| RelayError::Storage(e.to_string()))?;

    Ok(CatalogEntry {
        workflow_id: workflow_id as u64,
        workflow_name: get_text(1)?,
        workflow_description: get_text(2)?,
        workflow_json: get_text(3)?,
        n8n_demo: get_text(4)?,
        summary_accomplishment: get_text(5)?,
        summary_nodes: get_text(6)?,
        summary_suggestions: get_text(7)?,
        embedding: serde_json::from_str(&get_text(8)?)?,
        content: get_text(9)?,
        metadata: serde_json::from_str(&get_text(10)?)?,
    })
}

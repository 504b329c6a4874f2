//! Conversation-history adapter.
//!
//! Reads the most recent messages of a session and appends new ones. The
//! read path queries newest-first bounded by the limit and then reverses,
//! so callers always see the retrieved window oldest-first.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

pub use relay_core::config::DEFAULT_HISTORY_LIMIT;
use relay_core::error::RelayError;
use relay_core::types::{MessageBody, StoredMessage};

use crate::db::Database;

/// Storage seam used by the request handlers.
///
/// Every fault is reported as [`RelayError::HistoryUnavailable`]; nothing
/// is retried.
pub trait HistoryStore: Send + Sync {
    /// Up to `limit` most recent messages of the session, oldest first.
    fn fetch_recent(&self, session_id: &str, limit: usize)
        -> Result<Vec<StoredMessage>, RelayError>;

    /// Append one message; the store assigns its id and timestamp.
    fn append(&self, session_id: &str, message: &MessageBody) -> Result<Uuid, RelayError>;
}

/// SQLite-backed [`HistoryStore`].
pub struct MessageRepository {
    db: Arc<Database>,
}

impl MessageRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Count the messages stored for a session.
    pub fn count(&self, session_id: &str) -> Result<u64, RelayError> {
        self.db
            .with_conn(|conn| {
                let count: i64 = conn
                    .query_row(
                        "SELECT COUNT(*) FROM messages WHERE session_id = ?1",
                        rusqlite::params![session_id],
                        |row| row.get(0),
                    )
                    .map_err(|e| RelayError::HistoryUnavailable(e.to_string()))?;
                Ok(count as u64)
            })
            .map_err(unavailable)
    }
}

impl HistoryStore for MessageRepository {
    fn fetch_recent(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, RelayError> {
        self.db
            .with_conn(|conn| {
                // rowid breaks ties between messages appended in the same millisecond.
                let mut stmt = conn
                    .prepare(
                        "SELECT id, session_id, message, created_at
                         FROM messages
                         WHERE session_id = ?1
                         ORDER BY created_at DESC, rowid DESC
                         LIMIT ?2",
                    )
                    .map_err(|e| RelayError::HistoryUnavailable(e.to_string()))?;

                let rows = stmt
                    .query_map(rusqlite::params![session_id, limit as i64], |row| {
                        Ok(row_to_message(row))
                    })
                    .map_err(|e| RelayError::HistoryUnavailable(e.to_string()))?;

                let mut messages = Vec::new();
                for row in rows {
                    let message =
                        row.map_err(|e| RelayError::HistoryUnavailable(e.to_string()))??;
                    messages.push(message);
                }

                messages.reverse();
                Ok(messages)
            })
            .map_err(unavailable)
    }

    fn append(&self, session_id: &str, message: &MessageBody) -> Result<Uuid, RelayError> {
        let id = Uuid::new_v4();
        let document = serde_json::to_string(message)
            .map_err(|e| RelayError::HistoryUnavailable(format!("Failed to encode message: {}", e)))?;

        self.db
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO messages (id, session_id, message, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    rusqlite::params![
                        id.to_string(),
                        session_id,
                        document,
                        Utc::now().timestamp_millis(),
                    ],
                )
                .map_err(|e| {
                    RelayError::HistoryUnavailable(format!("Failed to store message: {}", e))
                })?;
                Ok(())
            })
            .map_err(unavailable)?;

        tracing::debug!(session_id, kind = %message.kind, "Message appended");
        Ok(id)
    }
}

/// Lock poisoning and other database-level faults surface as history faults.
fn unavailable(err: RelayError) -> RelayError {
    match err {
        RelayError::HistoryUnavailable(msg) => RelayError::HistoryUnavailable(msg),
        other => RelayError::HistoryUnavailable(other.to_string()),
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<StoredMessage, RelayError> {
    let id_str: String = row
        .get(0)
        .map_err(|e| RelayError::HistoryUnavailable(e.to_string()))?;
    let session_id: String = row
        .get(1)
        .map_err(|e| RelayError::HistoryUnavailable(e.to_string()))?;
    let document: String = row
        .get(2)
        .map_err(|e| RelayError::HistoryUnavailable(e.to_string()))?;
    let created_ms: i64 = row
        .get(3)
        .map_err(|e| RelayError::HistoryUnavailable(e.to_string()))?;

    let id = Uuid::parse_str(&id_str)
        .map_err(|e| RelayError::HistoryUnavailable(format!("Invalid message id: {}", e)))?;
    let message: MessageBody = serde_json::from_str(&document)
        .map_err(|e| RelayError::HistoryUnavailable(format!("Invalid message document: {}", e)))?;
    let created_at: DateTime<Utc> = Utc
        .timestamp_millis_opt(created_ms)
        .single()
        .ok_or_else(|| {
            RelayError::HistoryUnavailable(format!("Invalid timestamp: {}", created_ms))
        })?;

    Ok(StoredMessage {
        id,
        session_id,
        message,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::types::MessageType;
    use serde_json::json;

    fn make_repo() -> MessageRepository {
        MessageRepository::new(Arc::new(Database::in_memory().unwrap()))
    }

    fn seed(repo: &MessageRepository, session: &str, n: usize) {
        for i in 1..=n {
            let kind = if i % 2 == 1 {
                MessageType::Human
            } else {
                MessageType::Ai
            };
            repo.append(session, &MessageBody::new(kind, format!("m{}", i)))
                .unwrap();
        }
    }

    fn contents(messages: &[StoredMessage]) -> Vec<String> {
        messages.iter().map(|m| m.message.content.clone()).collect()
    }

    #[test]
    fn test_fetch_window_is_most_recent_in_ascending_order() {
        let repo = make_repo();
        seed(&repo, "s1", 15);

        let messages = repo.fetch_recent("s1", 10).unwrap();
        let expected: Vec<String> = (6..=15).map(|i| format!("m{}", i)).collect();
        assert_eq!(contents(&messages), expected);
    }

    #[test]
    fn test_fetch_returns_all_when_fewer_than_limit() {
        let repo = make_repo();
        seed(&repo, "s1", 3);

        let messages = repo.fetch_recent("s1", DEFAULT_HISTORY_LIMIT).unwrap();
        assert_eq!(contents(&messages), vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn test_fetch_is_non_decreasing_in_time() {
        let repo = make_repo();
        seed(&repo, "s1", 12);

        for limit in [1, 5, 12, 20] {
            let messages = repo.fetch_recent("s1", limit).unwrap();
            assert_eq!(messages.len(), limit.min(12));
            assert!(messages
                .windows(2)
                .all(|w| w[0].created_at <= w[1].created_at));
        }
    }

    #[test]
    fn test_append_then_fetch_returns_it_last() {
        let repo = make_repo();
        seed(&repo, "s1", 4);

        let id = repo
            .append(
                "s1",
                &MessageBody::new(MessageType::Human, "latest").with_data(json!({"request_id": "r"})),
            )
            .unwrap();

        let messages = repo.fetch_recent("s1", 1).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, id);
        assert_eq!(messages[0].message.content, "latest");
        assert_eq!(messages[0].message.data, Some(json!({"request_id": "r"})));
    }

    #[test]
    fn test_sessions_are_isolated() {
        let repo = make_repo();
        seed(&repo, "a", 2);
        seed(&repo, "b", 5);

        assert_eq!(repo.fetch_recent("a", 10).unwrap().len(), 2);
        assert_eq!(repo.count("b").unwrap(), 5);
        assert!(repo.fetch_recent("missing", 10).unwrap().is_empty());
    }

    #[test]
    fn test_append_increments_count_by_one() {
        let repo = make_repo();
        seed(&repo, "s", 2);
        let before = repo.count("s").unwrap();
        repo.append("s", &MessageBody::new(MessageType::Ai, "x"))
            .unwrap();
        assert_eq!(repo.count("s").unwrap(), before + 1);
    }

    #[test]
    fn test_data_is_stored_as_is() {
        let repo = make_repo();
        let blob = json!([{"type": "text", "payload": {"message": "hello"}}]);
        repo.append(
            "s",
            &MessageBody::new(MessageType::Ai, "").with_data(blob.clone()),
        )
        .unwrap();

        let messages = repo.fetch_recent("s", 10).unwrap();
        assert_eq!(messages[0].message.data, Some(blob));
        assert_eq!(messages[0].message.kind, MessageType::Ai);
    }

    #[test]
    fn test_corrupt_document_is_history_unavailable() {
        let db = Arc::new(Database::in_memory().unwrap());
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, session_id, message, created_at)
                 VALUES (?1, 's', 'not json', 0)",
                rusqlite::params![Uuid::new_v4().to_string()],
            )
            .map_err(|e| RelayError::Storage(e.to_string()))?;
            Ok(())
        })
        .unwrap();

        let repo = MessageRepository::new(db);
        assert!(matches!(
            repo.fetch_recent("s", 10),
            Err(RelayError::HistoryUnavailable(_))
        ));
    }
}

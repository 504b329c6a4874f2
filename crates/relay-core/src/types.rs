//! Domain types shared across the relay crates.
//!
//! `MessageBody` is the JSON document persisted for every conversation turn
//! (`{type, content, data?}`); `AgentRequest`/`AgentResponse` are the wire
//! shapes of every agent endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a stored message.
///
/// `Human` and `Ai` are the logical roles. `Assistant` is the
/// provider-native spelling some agents persist verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Human,
    Ai,
    Assistant,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Human => "human",
            MessageType::Ai => "ai",
            MessageType::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The persisted message document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageBody {
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub content: String,
    /// Opaque structured payload: attachments, error detail, provider blobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl MessageBody {
    pub fn new(kind: MessageType, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Attachments recorded on a human message under `data.files`, if any.
    ///
    /// Returns `Ok(None)` when there is no `files` key. A `files` value that
    /// is not a list of `{name, base64}` objects is an error.
    pub fn attached_files(&self) -> Result<Option<Vec<FileAttachment>>, serde_json::Error> {
        match self.data.as_ref().and_then(|d| d.get("files")) {
            Some(files) => serde_json::from_value(files.clone()).map(Some),
            None => Ok(None),
        }
    }
}

/// A message as read back from the history store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: Uuid,
    pub session_id: String,
    pub message: MessageBody,
    pub created_at: DateTime<Utc>,
}

/// A file sent alongside a query. Never persisted on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAttachment {
    pub name: String,
    pub base64: String,
    /// Client-supplied keys beyond `name`/`base64`, kept as sent.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl FileAttachment {
    pub fn new(name: impl Into<String>, base64: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base64: base64.into(),
            extra: serde_json::Map::new(),
        }
    }
}

/// Body of every agent endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRequest {
    pub query: String,
    pub user_id: String,
    pub request_id: String,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<FileAttachment>>,
}

/// Response of every agent endpoint. Details live in the session transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub success: bool,
}

/// One crawled and summarized workflow template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub workflow_id: u64,
    pub workflow_name: String,
    pub workflow_description: String,
    /// The workflow graph serialized as JSON text.
    pub workflow_json: String,
    /// `<n8n-demo>` embed snippet.
    pub n8n_demo: String,
    pub summary_accomplishment: String,
    pub summary_nodes: String,
    pub summary_suggestions: String,
    pub embedding: Vec<f32>,
    /// The three summaries joined by blank lines; the embedded text.
    pub content: String,
    pub metadata: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_body_serializes_type_field() {
        let body = MessageBody::new(MessageType::Human, "hello");
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value, json!({"type": "human", "content": "hello"}));
    }

    #[test]
    fn test_message_body_with_data() {
        let body =
            MessageBody::new(MessageType::Ai, "hi").with_data(json!({"request_id": "r-1"}));
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["data"]["request_id"], "r-1");
    }

    #[test]
    fn test_message_type_roundtrip_strings() {
        for (kind, s) in [
            (MessageType::Human, "human"),
            (MessageType::Ai, "ai"),
            (MessageType::Assistant, "assistant"),
        ] {
            assert_eq!(kind.as_str(), s);
            let parsed: MessageType = serde_json::from_value(json!(s)).unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn test_attached_files_absent() {
        let body = MessageBody::new(MessageType::Human, "q").with_data(json!({"request_id": "r"}));
        assert_eq!(body.attached_files().unwrap(), None);
    }

    #[test]
    fn test_attached_files_present() {
        let body = MessageBody::new(MessageType::Human, "q").with_data(json!({
            "request_id": "r",
            "files": [{"name": "a.txt", "base64": "aGVsbG8="}]
        }));
        let files = body.attached_files().unwrap().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "a.txt");
    }

    #[test]
    fn test_attached_files_malformed() {
        let body = MessageBody::new(MessageType::Human, "q")
            .with_data(json!({"files": [{"title": "missing keys"}]}));
        assert!(body.attached_files().is_err());
    }

    #[test]
    fn test_file_attachment_keeps_extra_keys() {
        let value = json!({"name": "a.txt", "base64": "aGVsbG8=", "mime": "text/plain", "size": 5});
        let file: FileAttachment = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(file.name, "a.txt");
        assert_eq!(file.extra["mime"], "text/plain");
        assert_eq!(serde_json::to_value(&file).unwrap(), value);

        let plain = FileAttachment::new("b.txt", "");
        assert_eq!(
            serde_json::to_value(&plain).unwrap(),
            json!({"name": "b.txt", "base64": ""})
        );
    }

    #[test]
    fn test_agent_request_files_optional() {
        let req: AgentRequest = serde_json::from_value(json!({
            "query": "hi",
            "user_id": "u",
            "request_id": "r",
            "session_id": "s"
        }))
        .unwrap();
        assert!(req.files.is_none());
    }
}

//! Voiceflow Dialog API client and query parsing.
//!
//! A query is either plain text or a "```json"-prefixed document produced
//! when the user clicks a button in the dialog UI. The document carries the
//! text to show in the transcript and the raw action to send back.

use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Url};
use serde::{Serialize, Serializer};
use serde_json::{json, Value};

use crate::error::ProviderError;
use crate::openai::check_status;

/// Marker that introduces an embedded action document.
pub const JSON_MARKER: &str = "```json";

/// Trace types the dialog runtime should leave out of its response.
const EXCLUDED_TRACE_TYPES: [&str; 3] = ["block", "debug", "flow"];

/// Outbound dialog action.
#[derive(Debug, Clone, PartialEq)]
pub enum DialogAction {
    /// Plain user text, sent as `{type: "text", payload: <text>}`.
    Text(String),
    /// An action object taken verbatim from an embedded document.
    Structured(Value),
}

impl DialogAction {
    pub fn to_value(&self) -> Value {
        match self {
            DialogAction::Text(text) => json!({"type": "text", "payload": text}),
            DialogAction::Structured(value) => value.clone(),
        }
    }
}

impl Serialize for DialogAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// A parsed dialog query.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogInput {
    /// Text persisted as the user's message.
    pub content: String,
    pub action: DialogAction,
}

/// Split a query into transcript text and outbound action.
///
/// Never fails: a marker followed by anything other than a JSON object
/// degrades to plain text carrying the whole original query.
pub fn parse_dialog_input(query: &str) -> DialogInput {
    let plain = || DialogInput {
        content: query.to_string(),
        action: DialogAction::Text(query.to_string()),
    };

    if !query.starts_with(JSON_MARKER) {
        return plain();
    }

    let stripped = query.replace(JSON_MARKER, "");
    match serde_json::from_str::<Value>(stripped.trim()) {
        Ok(Value::Object(document)) => {
            let content = document
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let action = document
                .get("data")
                .and_then(|data| data.get("request"))
                .cloned()
                .unwrap_or_else(|| json!({}));
            DialogInput {
                content,
                action: DialogAction::Structured(action),
            }
        }
        Ok(_) => {
            tracing::debug!("Embedded action is not an object; treating query as text");
            plain()
        }
        Err(e) => {
            tracing::debug!(error = %e, "Embedded action is not valid JSON; treating query as text");
            plain()
        }
    }
}

/// Cloneable handle to the dialog runtime.
#[derive(Clone)]
pub struct DialogClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl DialogClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self::with_http(Client::new(), base_url, api_key)
    }

    pub fn with_http(http: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key,
        }
    }

    fn interact_url(&self, session_id: &str) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            ProviderError::NotConfigured(format!("invalid dialog base url: {}", e))
        })?;
        url.path_segments_mut()
            .map_err(|_| ProviderError::NotConfigured("dialog base url cannot be a base".into()))?
            .pop_if_empty()
            .extend(["state", "user", session_id, "interact"]);
        url.query_pairs_mut().append_pair("logs", "off");
        Ok(url)
    }

    /// Send one action for a session and return the runtime's JSON response.
    pub async fn interact(
        &self,
        session_id: &str,
        action: &DialogAction,
    ) -> Result<Value, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("VOICEFLOW_AGENT_API_KEY".to_string()))?;

        let body = json!({
            "action": action,
            "config": {
                "tts": false,
                "stripSSML": true,
                "stopAll": false,
                "excludeTypes": EXCLUDED_TRACE_TYPES,
            }
        });

        let response = self
            .http
            .post(self.interact_url(session_id)?)
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, api_key)
            .json(&body)
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(response.json().await?)
    }
}

//! The `Agent` trait and its three variants.
//!
//! An agent decides what user message to persist for a request, turns the
//! replayed history plus the request into one provider call, and shapes the
//! provider's answer into the reply message to persist. The HTTP layer owns
//! everything else: auth, history reads and writes, and failure handling.

use async_trait::async_trait;
use serde_json::{json, Value};

use relay_core::types::{AgentRequest, MessageBody, MessageType, StoredMessage};

use crate::dialog::{parse_dialog_input, DialogClient};
use crate::error::ProviderError;
use crate::files::with_file_context;
use crate::openai::{ChatMessage, OpenAiClient};

/// What the handler does once a turn fails past authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Append an apology to the session and answer `{success: false}`.
    Apologize,
    /// Answer with an HTTP 500 carrying the error.
    Propagate,
}

#[async_trait]
pub trait Agent: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Apologize
    }

    /// Whether the handler should load history before invoking the agent.
    fn replays_history(&self) -> bool {
        true
    }

    /// Reject a history window the agent cannot replay. Runs before the
    /// user's message is persisted.
    fn check_history(&self, _history: &[StoredMessage]) -> Result<(), ProviderError> {
        Ok(())
    }

    /// The user message persisted before the provider is called.
    fn user_message(&self, request: &AgentRequest) -> MessageBody;

    /// Call the provider once and return the reply message to persist.
    ///
    /// `history` is oldest-first and does not contain the current query.
    async fn respond(
        &self,
        history: &[StoredMessage],
        request: &AgentRequest,
    ) -> Result<MessageBody, ProviderError>;
}

// =============================================================================
// Chat completion agent
// =============================================================================

/// Chat-completion agent that inlines base64 file attachments as context.
pub struct FileAgent {
    client: OpenAiClient,
    model: String,
}

impl FileAgent {
    pub fn new(client: OpenAiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Map stored turns to provider roles, inlining recorded attachments on
    /// user turns.
    pub fn history_messages(
        history: &[StoredMessage],
    ) -> Result<Vec<ChatMessage>, ProviderError> {
        let mut messages = Vec::with_capacity(history.len() + 1);

        for stored in history {
            let body = &stored.message;
            if body.kind == MessageType::Human {
                let files = body.attached_files().map_err(|e| {
                    ProviderError::Attachment(format!("stored message {}: {}", stored.id, e))
                })?;
                let content = match files {
                    Some(files) => with_file_context(&files, &body.content)?,
                    None => body.content.clone(),
                };
                messages.push(ChatMessage::user(content));
            } else {
                messages.push(ChatMessage::assistant(body.content.clone()));
            }
        }
        Ok(messages)
    }

    /// Build the provider conversation: replayed history, then the query.
    pub fn build_messages(
        history: &[StoredMessage],
        request: &AgentRequest,
    ) -> Result<Vec<ChatMessage>, ProviderError> {
        let mut messages = Self::history_messages(history)?;
        let current = match request.files.as_deref() {
            Some(files) => with_file_context(files, &request.query)?,
            None => request.query.clone(),
        };
        messages.push(ChatMessage::user(current));

        Ok(messages)
    }
}

#[async_trait]
impl Agent for FileAgent {
    fn name(&self) -> &'static str {
        "file-agent"
    }

    fn check_history(&self, history: &[StoredMessage]) -> Result<(), ProviderError> {
        Self::history_messages(history).map(|_| ())
    }

    fn user_message(&self, request: &AgentRequest) -> MessageBody {
        let mut data = json!({"request_id": request.request_id});
        if let Some(files) = request.files.as_ref().filter(|f| !f.is_empty()) {
            data["files"] = json!(files);
        }
        MessageBody::new(MessageType::Human, request.query.clone()).with_data(data)
    }

    async fn respond(
        &self,
        history: &[StoredMessage],
        request: &AgentRequest,
    ) -> Result<MessageBody, ProviderError> {
        let messages = Self::build_messages(history, request)?;
        tracing::debug!(
            session_id = %request.session_id,
            turns = messages.len(),
            model = %self.model,
            "Calling chat completion"
        );
        let text = self.client.chat(&self.model, &messages).await?;
        Ok(MessageBody::new(MessageType::Ai, text)
            .with_data(json!({"request_id": request.request_id})))
    }
}

// =============================================================================
// Dialog management agent
// =============================================================================

/// Agent backed by the Voiceflow Dialog API. The runtime keeps its own
/// per-session state, so no history is replayed.
pub struct DialogAgent {
    client: DialogClient,
}

impl DialogAgent {
    pub fn new(client: DialogClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Agent for DialogAgent {
    fn name(&self) -> &'static str {
        "dialog-agent"
    }

    fn replays_history(&self) -> bool {
        false
    }

    fn user_message(&self, request: &AgentRequest) -> MessageBody {
        MessageBody::new(MessageType::Human, parse_dialog_input(&request.query).content)
    }

    async fn respond(
        &self,
        _history: &[StoredMessage],
        request: &AgentRequest,
    ) -> Result<MessageBody, ProviderError> {
        let input = parse_dialog_input(&request.query);
        let traces = self.client.interact(&request.session_id, &input.action).await?;

        // The whole runtime response travels in `data`; the transcript UI renders it.
        let reply = MessageBody::new(MessageType::Ai, "");
        let empty = match &traces {
            Value::Null => true,
            Value::Array(items) => items.is_empty(),
            Value::Object(fields) => fields.is_empty(),
            _ => false,
        };
        Ok(if empty { reply } else { reply.with_data(traces) })
    }
}

// =============================================================================
// Placeholder agent
// =============================================================================

/// Reply persisted by [`SampleAgent`].
pub const SAMPLE_REPLY: &str = "This is a sample agent response...";

/// Placeholder agent with no provider behind it.
///
/// It prepares the history in `{role, content}` form with stored roles used
/// verbatim, then answers with a canned reply. Failures propagate as 500s.
#[derive(Default)]
pub struct SampleAgent;

impl SampleAgent {
    pub fn history_messages(history: &[StoredMessage]) -> Vec<ChatMessage> {
        history
            .iter()
            .map(|stored| ChatMessage {
                role: stored.message.kind.as_str().to_string(),
                content: stored.message.content.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl Agent for SampleAgent {
    fn name(&self) -> &'static str {
        "sample-agent"
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Propagate
    }

    fn user_message(&self, request: &AgentRequest) -> MessageBody {
        MessageBody::new(MessageType::Human, request.query.clone())
    }

    async fn respond(
        &self,
        history: &[StoredMessage],
        request: &AgentRequest,
    ) -> Result<MessageBody, ProviderError> {
        let messages = Self::history_messages(history);
        tracing::debug!(
            session_id = %request.session_id,
            turns = messages.len(),
            "Sample agent prepared history"
        );
        Ok(MessageBody::new(MessageType::Assistant, SAMPLE_REPLY))
    }
}

//! Client for an OpenAI-compatible chat-completion and embeddings API.
//!
//! One non-streaming request per call; no retries. The API key is
//! optional at construction so the server can start without it and fail
//! the individual call instead.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

const CHAT_COMPLETIONS_PATH: &str = "chat/completions";
const EMBEDDINGS_PATH: &str = "embeddings";

/// A chat message in the provider's role vocabulary (`user`, `assistant`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Cloneable handle to the chat/embeddings API.
#[derive(Clone)]
pub struct OpenAiClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self::with_http(Client::new(), base_url, api_key)
    }

    /// Build on an existing reqwest client (shared connection pool).
    pub fn with_http(http: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn bearer(&self) -> Result<String, ProviderError> {
        self.api_key
            .as_deref()
            .map(|key| format!("Bearer {}", key))
            .ok_or_else(|| ProviderError::NotConfigured("OPENAI_API_KEY".to_string()))
    }

    /// Send one chat completion and return the top choice's text verbatim.
    pub async fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        let auth = self.bearer()?;
        let response = self
            .http
            .post(self.endpoint(CHAT_COMPLETIONS_PATH))
            .header(AUTHORIZATION, auth)
            .header(CONTENT_TYPE, "application/json")
            .json(&ChatCompletionRequest { model, messages })
            .send()
            .await?;

        let response = check_status(response).await?;
        let body: ChatCompletionResponse = response.json().await?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::InvalidResponse("completion has no content".to_string()))
    }

    /// Embed a single text.
    pub async fn embed(
        &self,
        model: &str,
        input: &str,
        dimensions: Option<usize>,
    ) -> Result<Vec<f32>, ProviderError> {
        let auth = self.bearer()?;
        let response = self
            .http
            .post(self.endpoint(EMBEDDINGS_PATH))
            .header(AUTHORIZATION, auth)
            .header(CONTENT_TYPE, "application/json")
            .json(&EmbeddingRequest {
                model,
                input,
                dimensions,
            })
            .send()
            .await?;

        let response = check_status(response).await?;
        let body: EmbeddingResponse = response.json().await?;

        body.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| ProviderError::InvalidResponse("embedding response is empty".to_string()))
    }
}

/// Turn a non-2xx response into [`ProviderError::Status`] with its body.
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Status {
        status: status.as_u16(),
        body,
    })
}

//! Client for the public workflow-template catalog.
//!
//! `GET {base}/templates/workflows/{id}` answers
//! `{"workflow": {"name", "description", "workflow": {...}}}` for existing
//! templates. Anything other than a 200 with that shape is a fetch failure.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::error::CrawlerError;

/// One template as returned by the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub id: u64,
    pub name: String,
    pub description: String,
    /// The workflow graph (nodes and connections).
    pub workflow: Value,
}

impl Template {
    /// The workflow graph as compact JSON text.
    pub fn workflow_json(&self) -> String {
        self.workflow.to_string()
    }

    /// Text handed to the LLM: JSON-quoted name and description, then the graph.
    pub fn info(&self) -> String {
        format!(
            "Name: {}\nDescription: {}\n\nJSON:\n{}",
            Value::from(self.name.as_str()),
            Value::from(self.description.as_str()),
            self.workflow_json()
        )
    }
}

#[async_trait]
pub trait TemplateSource: Send + Sync {
    async fn fetch(&self, id: u64) -> Result<Template, CrawlerError>;
}

#[derive(Deserialize)]
struct TemplateEnvelope {
    workflow: TemplateBody,
}

#[derive(Deserialize)]
struct TemplateBody {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    workflow: Value,
}

/// HTTP-backed [`TemplateSource`].
#[derive(Clone)]
pub struct N8nCatalog {
    http: Client,
    base_url: String,
}

impl N8nCatalog {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http(Client::new(), base_url)
    }

    pub fn with_http(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl TemplateSource for N8nCatalog {
    async fn fetch(&self, id: u64) -> Result<Template, CrawlerError> {
        let url = format!("{}/templates/workflows/{}", self.base_url, id);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| CrawlerError::Fetch(e.to_string()))?;

        if response.status() != StatusCode::OK {
            return Err(CrawlerError::Fetch(format!(
                "template {} returned status {}",
                id,
                response.status().as_u16()
            )));
        }

        let envelope: TemplateEnvelope = response
            .json()
            .await
            .map_err(|e| CrawlerError::Malformed(format!("template {}: {}", id, e)))?;
        let body = envelope.workflow;

        Ok(Template {
            id,
            name: body.name.unwrap_or_default(),
            description: body.description.unwrap_or_default(),
            workflow: body.workflow,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_info_quotes_name_and_description() {
        let template = Template {
            id: 7,
            name: "Slack \"alerts\"".into(),
            description: "Posts alerts".into(),
            workflow: json!({"nodes": []}),
        };
        assert_eq!(
            template.info(),
            "Name: \"Slack \\\"alerts\\\"\"\nDescription: \"Posts alerts\"\n\nJSON:\n{\"nodes\":[]}"
        );
    }

    #[tokio::test]
    async fn test_fetch_existing_template() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/templates/workflows/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "workflow": {
                    "id": 42,
                    "name": "Email digest",
                    "description": "Sends a daily digest",
                    "workflow": {"nodes": [{"name": "Cron"}], "connections": {}}
                }
            })))
            .mount(&server)
            .await;

        let catalog = N8nCatalog::new(format!("{}/api/", server.uri()));
        let template = catalog.fetch(42).await.unwrap();
        assert_eq!(template.id, 42);
        assert_eq!(template.name, "Email digest");
        assert_eq!(template.description, "Sends a daily digest");
        assert_eq!(template.workflow["nodes"][0]["name"], "Cron");
    }

    #[tokio::test]
    async fn test_fetch_missing_template_is_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let catalog = N8nCatalog::new(server.uri());
        let err = catalog.fetch(1).await.unwrap_err();
        assert!(matches!(err, CrawlerError::Fetch(_)));
    }

    #[tokio::test]
    async fn test_fetch_null_description_defaults_to_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "workflow": {"name": "x", "description": null, "workflow": {}}
            })))
            .mount(&server)
            .await;

        let template = N8nCatalog::new(server.uri()).fetch(3).await.unwrap();
        assert_eq!(template.description, "");
    }

    #[tokio::test]
    async fn test_fetch_body_without_graph_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "workflow": {"name": "x", "description": "y"}
            })))
            .mount(&server)
            .await;

        let err = N8nCatalog::new(server.uri()).fetch(3).await.unwrap_err();
        assert!(matches!(err, CrawlerError::Malformed(_)));
    }
}

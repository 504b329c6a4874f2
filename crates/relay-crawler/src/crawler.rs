//! The crawl loop and its collaborators.
//!
//! IDs are walked sequentially. Only fetch failures count toward the abort
//! threshold. Reaching a verdict resets it, whether or not the entry is
//! then stored. A failed judgment call skips the ID and leaves the counter
//! alone.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use relay_core::config::CrawlerConfig;
use relay_core::error::RelayError;
use relay_core::types::CatalogEntry;
use relay_provider::{ChatMessage, OpenAiClient, ProviderError};
use relay_storage::CatalogRepository;

use crate::analysis::{demo_snippet, legitimacy_prompt, summary_prompts, Verdict};
use crate::catalog::{Template, TemplateSource};
use crate::error::CrawlerError;

/// Single-prompt text completion.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;
}

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;
}

/// Where finished catalog entries go.
pub trait CatalogSink: Send + Sync {
    fn store(&self, entry: &CatalogEntry) -> Result<(), RelayError>;
}

/// [`CompletionModel`] over the chat-completion API.
pub struct OpenAiCompletion {
    client: OpenAiClient,
    model: String,
}

impl OpenAiCompletion {
    pub fn new(client: OpenAiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl CompletionModel for OpenAiCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        self.client
            .chat(&self.model, &[ChatMessage::user(prompt)])
            .await
    }
}

pub struct OpenAiEmbedder {
    client: OpenAiClient,
    model: String,
    dimensions: Option<usize>,
}

impl OpenAiEmbedder {
    pub fn new(client: OpenAiClient, model: impl Into<String>, dimensions: Option<usize>) -> Self {
        Self {
            client,
            model: model.into(),
            dimensions,
        }
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        self.client.embed(&self.model, text, self.dimensions).await
    }
}

impl CatalogSink for CatalogRepository {
    fn store(&self, entry: &CatalogEntry) -> Result<(), RelayError> {
        self.upsert(entry)
    }
}

/// Loop bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSettings {
    /// Last ID to try, inclusive. IDs start at 1.
    pub max_id: u64,
    pub max_consecutive_failures: u32,
    /// Pause after every iteration.
    pub delay: Duration,
}

impl From<&CrawlerConfig> for CrawlSettings {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            max_id: config.max_id,
            max_consecutive_failures: config.max_consecutive_failures,
            delay: Duration::from_millis(config.delay_ms),
        }
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlReport {
    /// IDs attempted.
    pub processed: u64,
    pub stored: u64,
    /// Fetched but judged test/spam.
    pub rejected: u64,
    /// Fetched but dropped on a judgment, summary, embedding or storage error.
    pub skipped: u64,
    pub failed_fetches: u64,
    /// Stopped on the consecutive-failure threshold.
    pub aborted: bool,
    pub last_id: u64,
}

/// What happened to a fetched template once a verdict was reached.
enum ItemOutcome {
    Stored,
    Rejected,
    /// Judged legitimate, then summaries, embedding or storage failed.
    Unstored(CrawlerError),
}

pub struct Crawler {
    source: Arc<dyn TemplateSource>,
    model: Arc<dyn CompletionModel>,
    embedder: Arc<dyn Embedder>,
    sink: Arc<dyn CatalogSink>,
    settings: CrawlSettings,
}

impl Crawler {
    pub fn new(
        source: Arc<dyn TemplateSource>,
        model: Arc<dyn CompletionModel>,
        embedder: Arc<dyn Embedder>,
        sink: Arc<dyn CatalogSink>,
        settings: CrawlSettings,
    ) -> Self {
        Self {
            source,
            model,
            embedder,
            sink,
            settings,
        }
    }

    /// Crawl IDs `1..=max_id`, stopping early on too many fetch failures in a row.
    pub async fn run(&self) -> CrawlReport {
        let mut report = CrawlReport::default();
        let mut consecutive_failures: u32 = 0;

        info!(
            max_id = self.settings.max_id,
            max_consecutive_failures = self.settings.max_consecutive_failures,
            "Starting catalog crawl"
        );

        for id in 1..=self.settings.max_id {
            report.processed += 1;
            report.last_id = id;

            match self.source.fetch(id).await {
                Err(e) => {
                    report.failed_fetches += 1;
                    consecutive_failures += 1;
                    debug!(workflow_id = id, consecutive_failures, error = %e, "No template");
                    if consecutive_failures >= self.settings.max_consecutive_failures {
                        warn!(
                            workflow_id = id,
                            "Reached {} consecutive failures. Stopping.",
                            consecutive_failures
                        );
                        report.aborted = true;
                        break;
                    }
                }
                Ok(template) => match self.process(&template).await {
                    Ok(outcome) => {
                        consecutive_failures = 0;
                        match outcome {
                            ItemOutcome::Stored => {
                                report.stored += 1;
                                info!(
                                    workflow_id = id,
                                    name = %template.name,
                                    "Stored template"
                                );
                            }
                            ItemOutcome::Rejected => {
                                report.rejected += 1;
                                debug!(workflow_id = id, "Template judged test/spam");
                            }
                            ItemOutcome::Unstored(e) => {
                                report.skipped += 1;
                                warn!(workflow_id = id, error = %e, "Skipping template");
                            }
                        }
                    }
                    // No verdict: the counter is left as it was.
                    Err(e) => {
                        report.skipped += 1;
                        warn!(
                            workflow_id = id,
                            error = %e,
                            "Legitimacy check failed; skipping template"
                        );
                    }
                },
            }

            if !self.settings.delay.is_zero() {
                tokio::time::sleep(self.settings.delay).await;
            }
        }

        info!(?report, "Catalog crawl finished");
        report
    }

    /// Judge, then build and store. `Err` only when the judgment call fails.
    async fn process(&self, template: &Template) -> Result<ItemOutcome, CrawlerError> {
        let info = template.info();

        let judgment = self.model.complete(&legitimacy_prompt(&info)).await?;
        if Verdict::parse(&judgment) == Verdict::Rejected {
            return Ok(ItemOutcome::Rejected);
        }

        let stored = match self.build_entry(template, &info).await {
            Ok(entry) => self.sink.store(&entry).map_err(CrawlerError::from),
            Err(e) => Err(e),
        };
        Ok(match stored {
            Ok(()) => ItemOutcome::Stored,
            Err(e) => ItemOutcome::Unstored(e),
        })
    }

    /// Summaries, embedding and metadata for a legitimate template.
    pub async fn build_entry(
        &self,
        template: &Template,
        info: &str,
    ) -> Result<CatalogEntry, CrawlerError> {
        let workflow_json = template.workflow_json();
        let n8n_demo = demo_snippet(&workflow_json);

        let mut summaries = Vec::with_capacity(3);
        for prompt in summary_prompts(info) {
            summaries.push(self.model.complete(&prompt).await?);
        }
        let content = summaries.join("\n\n");
        let embedding = self.embedder.embed(&content).await?;

        let metadata = json!({
            "workflow_id": template.id,
            "workflow_name": template.name,
            "workflow_description": template.description,
            "n8n_demo": n8n_demo,
            "workflow_json": template.workflow,
        });

        let mut summaries = summaries.into_iter();
        Ok(CatalogEntry {
            workflow_id: template.id,
            workflow_name: template.name.clone(),
            workflow_description: template.description.clone(),
            workflow_json,
            n8n_demo,
            summary_accomplishment: summaries.next().unwrap_or_default(),
            summary_nodes: summaries.next().unwrap_or_default(),
            summary_suggestions: summaries.next().unwrap_or_default(),
            embedding,
            content,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use relay_storage::Database;

    /// Serves templates for the given IDs; every other ID is a fetch failure.
    struct FakeSource {
        templates: HashMap<u64, Template>,
        fetched: Mutex<Vec<u64>>,
    }

    impl FakeSource {
        fn with_ids(ids: &[u64]) -> Self {
            let templates = ids
                .iter()
                .map(|&id| {
                    (
                        id,
                        Template {
                            id,
                            name: format!("template-{id}"),
                            description: format!("description {id}"),
                            workflow: json!({"nodes": [{"name": format!("node-{id}")}]}),
                        },
                    )
                })
                .collect();
            Self {
                templates,
                fetched: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TemplateSource for FakeSource {
        async fn fetch(&self, id: u64) -> Result<Template, CrawlerError> {
            self.fetched.lock().unwrap().push(id);
            self.templates
                .get(&id)
                .cloned()
                .ok_or_else(|| CrawlerError::Fetch(format!("template {id} returned status 404")))
        }
    }

    /// Judges by template name; summaries echo their prompt kind.
    struct FakeModel {
        bad: Vec<String>,
        broken_judge: Vec<String>,
        broken_summary: Vec<String>,
    }

    impl FakeModel {
        fn approving() -> Self {
            Self {
                bad: Vec::new(),
                broken_judge: Vec::new(),
                broken_summary: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl CompletionModel for FakeModel {
        async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
            if prompt.contains("Output (GOOD/BAD):") {
                if self.broken_judge.iter().any(|n| prompt.contains(n.as_str())) {
                    return Err(ProviderError::InvalidResponse("judge down".into()));
                }
                if self.bad.iter().any(|n| prompt.contains(n.as_str())) {
                    return Ok("BAD".into());
                }
                return Ok(" GOOD\n".into());
            }
            if self.broken_summary.iter().any(|n| prompt.contains(n.as_str())) {
                return Err(ProviderError::Status {
                    status: 500,
                    body: "boom".into(),
                });
            }
            Ok(if prompt.starts_with("Summarize what") {
                "purpose".into()
            } else if prompt.starts_with("Summarize all") {
                "nodes".into()
            } else {
                "ideas".into()
            })
        }
    }

    struct FakeEmbedder;

    #[async_trait]
    impl Embedder for FakeEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
            Ok(vec![text.len() as f32, 1.0])
        }
    }

    #[derive(Default)]
    struct MemorySink {
        entries: Mutex<Vec<CatalogEntry>>,
    }

    impl CatalogSink for MemorySink {
        fn store(&self, entry: &CatalogEntry) -> Result<(), RelayError> {
            self.entries.lock().unwrap().push(entry.clone());
            Ok(())
        }
    }

    fn settings(max_id: u64, max_failures: u32) -> CrawlSettings {
        CrawlSettings {
            max_id,
            max_consecutive_failures: max_failures,
            delay: Duration::ZERO,
        }
    }

    fn crawler(
        source: Arc<FakeSource>,
        model: FakeModel,
        sink: Arc<dyn CatalogSink>,
        settings: CrawlSettings,
    ) -> Crawler {
        Crawler::new(
            source,
            Arc::new(model),
            Arc::new(FakeEmbedder),
            sink,
            settings,
        )
    }

    #[tokio::test]
    async fn test_stops_after_consecutive_failures() {
        let source = Arc::new(FakeSource::with_ids(&[]));
        let sink = Arc::new(MemorySink::default());
        let report = crawler(
            source.clone(),
            FakeModel::approving(),
            sink.clone(),
            settings(2500, 1000),
        )
        .run()
        .await;

        assert!(report.aborted);
        assert_eq!(report.last_id, 1000);
        assert_eq!(report.failed_fetches, 1000);
        assert_eq!(source.fetched.lock().unwrap().last(), Some(&1000));
        assert!(!source.fetched.lock().unwrap().contains(&1001));
        assert!(sink.entries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_template_resets_failure_counter() {
        // 1-2 fail, 3 is rejected, 4-5 fail: never three in a row.
        let source = Arc::new(FakeSource::with_ids(&[3]));
        let model = FakeModel {
            bad: vec!["template-3".into()],
            ..FakeModel::approving()
        };
        let sink = Arc::new(MemorySink::default());
        let report = crawler(source, model, sink.clone(), settings(5, 3)).run().await;

        assert!(!report.aborted);
        assert_eq!(report.processed, 5);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.failed_fetches, 4);
        assert!(sink.entries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_judgment_error_skips_without_resetting_counter() {
        // 1 fails, 2 has a broken judgment, 3 fails: the third failure aborts.
        let source = Arc::new(FakeSource::with_ids(&[2]));
        let model = FakeModel {
            broken_judge: vec!["template-2".into()],
            ..FakeModel::approving()
        };
        let report = crawler(
            source,
            model,
            Arc::new(MemorySink::default()),
            settings(10, 2),
        )
        .run()
        .await;

        assert_eq!(report.skipped, 1);
        assert!(report.aborted);
        assert_eq!(report.last_id, 3);
    }

    #[tokio::test]
    async fn test_summary_failure_writes_nothing() {
        let source = Arc::new(FakeSource::with_ids(&[1, 2]));
        let model = FakeModel {
            broken_summary: vec!["template-1".into()],
            ..FakeModel::approving()
        };
        let sink = Arc::new(MemorySink::default());
        let report = crawler(source, model, sink.clone(), settings(2, 10)).run().await;

        assert_eq!(report.skipped, 1);
        assert_eq!(report.stored, 1);
        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].workflow_id, 2);
    }

    #[tokio::test]
    async fn test_verdict_resets_counter_even_if_storing_fails() {
        // 1 fails, 2 is judged GOOD but its summary fails, 3 fails: no two in a row.
        let source = Arc::new(FakeSource::with_ids(&[2]));
        let model = FakeModel {
            broken_summary: vec!["template-2".into()],
            ..FakeModel::approving()
        };
        let sink = Arc::new(MemorySink::default());
        let report = crawler(source, model, sink.clone(), settings(3, 2)).run().await;

        assert!(!report.aborted);
        assert_eq!(report.processed, 3);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed_fetches, 2);
        assert!(sink.entries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_legitimate_template_entry_contents() {
        let source = Arc::new(FakeSource::with_ids(&[7]));
        let sink = Arc::new(MemorySink::default());
        let report = crawler(source, FakeModel::approving(), sink.clone(), settings(7, 10))
            .run()
            .await;

        assert_eq!(report.stored, 1);
        let entries = sink.entries.lock().unwrap();
        let entry = &entries[0];
        assert_eq!(entry.workflow_id, 7);
        assert_eq!(entry.workflow_name, "template-7");
        assert_eq!(entry.summary_accomplishment, "purpose");
        assert_eq!(entry.summary_nodes, "nodes");
        assert_eq!(entry.summary_suggestions, "ideas");
        assert_eq!(entry.content, "purpose\n\nnodes\n\nideas");
        assert_eq!(entry.embedding, vec![entry.content.len() as f32, 1.0]);
        assert_eq!(entry.workflow_json, r#"{"nodes":[{"name":"node-7"}]}"#);
        assert_eq!(
            entry.n8n_demo,
            r#"<n8n-demo workflow='{"nodes":[{"name":"node-7"}]}'></n8n-demo>"#
        );
        assert_eq!(entry.metadata["workflow_id"], 7);
        assert_eq!(entry.metadata["workflow_json"]["nodes"][0]["name"], "node-7");
        assert_eq!(entry.metadata["n8n_demo"], entry.n8n_demo.as_str());
    }

    #[tokio::test]
    async fn test_crawl_into_sqlite_catalog() {
        let repo = Arc::new(CatalogRepository::new(Arc::new(Database::in_memory().unwrap())));
        let source = Arc::new(FakeSource::with_ids(&[1, 3]));
        let report = crawler(source, FakeModel::approving(), repo.clone(), settings(3, 5))
            .run()
            .await;

        assert_eq!(report.stored, 2);
        assert_eq!(repo.count().unwrap(), 2);
        let stored = repo.find_by_id(3).unwrap().unwrap();
        assert_eq!(stored.content, "purpose\n\nnodes\n\nideas");
    }

    #[test]
    fn test_settings_from_config() {
        let settings = CrawlSettings::from(&CrawlerConfig::default());
        assert_eq!(settings.max_id, 2500);
        assert_eq!(settings.max_consecutive_failures, 1000);
        assert_eq!(settings.delay, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_completion_sends_model_name_to_openai_endpoint() {
        use wiremock::matchers::{body_partial_json, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({
                "model": "claude-3-5-sonnet",
                "messages": [{"role": "user", "content": "judge this"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "GOOD"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        // Any model name goes to the OpenAI-compatible endpoint as-is.
        let client = OpenAiClient::new(server.uri(), Some("k".into()));
        let model = OpenAiCompletion::new(client, "claude-3-5-sonnet");
        assert_eq!(model.complete("judge this").await.unwrap(), "GOOD");
    }
}

//! Relay crawler crate - builds the searchable workflow-template catalog.
//!
//! Walks the public template API by sequential ID, asks an LLM to reject
//! test/spam templates, summarizes the rest three ways, embeds the combined
//! summaries and upserts one catalog row per legitimate template.

pub mod analysis;
pub mod catalog;
pub mod crawler;
pub mod error;

pub use analysis::Verdict;
pub use catalog::{N8nCatalog, Template, TemplateSource};
pub use crawler::{
    CatalogSink, CompletionModel, CrawlReport, CrawlSettings, Crawler, Embedder, OpenAiCompletion,
    OpenAiEmbedder,
};
pub use error::CrawlerError;

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{RelayError, Result};

/// Top-level configuration for the relay services.
///
/// Loaded from a TOML file, then overlaid with environment variables
/// (see [`RelayConfig::apply_env`]). Every section falls back to defaults
/// so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub agents: AgentsConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub dialog: DialogConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
}

impl RelayConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: RelayConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Overlay values from the process environment (after loading `.env`).
    pub fn apply_process_env(&mut self) {
        if let Ok(path) = dotenvy::dotenv() {
            info!("Environment loaded from {}", path.display());
        }
        self.apply_env(|key| std::env::var(key).ok());
    }

    /// Overlay values from an environment lookup.
    ///
    /// Empty values are ignored so that `API_BEARER_TOKEN=` does not count
    /// as a configured secret.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get("API_BEARER_TOKEN") {
            self.auth.bearer_token = Some(token);
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            self.openai.api_key = Some(key);
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            self.openai.base_url = url;
        }
        if let Some(key) = get("VOICEFLOW_AGENT_API_KEY") {
            self.dialog.api_key = Some(key);
        }
        if let Some(path) = get("DATABASE_PATH") {
            self.storage.database_path = path;
        }
        if let Some(model) = get("LLM_MODEL") {
            self.crawler.llm_model = model;
        }
        if let Some(model) = get("EMBEDDING_MODEL") {
            self.crawler.embedding_model = model;
        }
        if let Some(port) = get("RELAY_PORT") {
            match port.parse::<u16>() {
                Ok(p) => self.server.port = p,
                Err(_) => warn!(value = %port, "Ignoring invalid RELAY_PORT"),
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| RelayError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Allow any origin (mirrors the request origin, credentials allowed).
    pub cors_permissive: bool,
    /// Maximum request body size. Base64 attachments make bodies large.
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8001,
            cors_permissive: true,
            body_limit_bytes: 20 * 1024 * 1024,
        }
    }
}

/// Bearer-token gate settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// The single shared secret. `None` makes every agent route answer 500.
    pub bearer_token: Option<String>,
}

/// Conversation store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file.
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "relay.db".to_string(),
        }
    }
}

/// Number of messages replayed to a provider when nothing else is configured.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// History replay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Number of most recent messages replayed to the provider.
    pub limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// Which agent routes are mounted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    pub file_agent: bool,
    pub dialog_agent: bool,
    pub sample_agent: bool,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            file_agent: true,
            dialog_agent: true,
            sample_agent: true,
        }
    }
}

/// Chat-completion provider settings (OpenAI-compatible).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub chat_model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
        }
    }
}

/// Dialog-management provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://general-runtime.voiceflow.com".to_string(),
        }
    }
}

/// Template catalog crawler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Base URL of the public template API.
    pub catalog_base_url: String,
    /// Last template ID visited (inclusive, starting from 1).
    pub max_id: u64,
    /// Consecutive fetch failures that abort the run.
    pub max_consecutive_failures: u32,
    /// Pause after every iteration.
    pub delay_ms: u64,
    /// Model used for the legitimacy check and the summaries. Always sent to
    /// the OpenAI-compatible endpoint; Anthropic models are not routed.
    pub llm_model: String,
    pub embedding_model: String,
    pub embedding_dimensions: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            catalog_base_url: "https://api.n8n.io/api".to_string(),
            max_id: 2500,
            max_consecutive_failures: 1000,
            delay_ms: 500,
            llm_model: "gpt-4o".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_dimensions: 1536,
        }
    }
}

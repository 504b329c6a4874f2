//! Startup helpers shared by the binaries: logging, config, storage and
//! agent wiring.

use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use relay_api::AgentSet;
use relay_core::config::RelayConfig;
use relay_core::error::RelayError;
use relay_provider::{DialogAgent, DialogClient, FileAgent, OpenAiClient, SampleAgent};
use relay_storage::Database;

use crate::cli::CommonArgs;

/// Install the global tracing subscriber.
///
/// `--log-level` wins over `RUST_LOG`; the fallback is `info`.
pub fn init_tracing(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Read the config file, or defaults when there is none.
pub fn read_config_file(path: &Path) -> RelayConfig {
    if path.exists() {
        RelayConfig::load_or_default(path)
    } else {
        tracing::info!(path = %path.display(), "No config file; using defaults");
        RelayConfig::default()
    }
}

/// File, then `.env` and process environment. CLI flags are applied by the caller.
pub fn load_config(common: &CommonArgs) -> RelayConfig {
    let mut config = read_config_file(&common.resolve_config_path());
    config.apply_process_env();
    config
}

pub fn open_database(config: &RelayConfig) -> Result<Arc<Database>, RelayError> {
    Ok(Arc::new(Database::new(Path::new(&config.storage.database_path))?))
}

/// Construct the agents enabled in `config.agents`, sharing one HTTP pool.
pub fn build_agents(config: &RelayConfig, http: &reqwest::Client) -> AgentSet {
    let mut agents = AgentSet::default();

    if config.agents.file_agent {
        if config.openai.api_key.is_none() {
            tracing::warn!("OPENAI_API_KEY not set; file agent requests will fail");
        }
        let client = OpenAiClient::with_http(
            http.clone(),
            config.openai.base_url.clone(),
            config.openai.api_key.clone(),
        );
        agents.file = Some(Arc::new(FileAgent::new(client, config.openai.chat_model.clone())));
    }

    if config.agents.dialog_agent {
        if config.dialog.api_key.is_none() {
            tracing::warn!("VOICEFLOW_AGENT_API_KEY not set; dialog agent requests will fail");
        }
        let client = DialogClient::with_http(
            http.clone(),
            config.dialog.base_url.clone(),
            config.dialog.api_key.clone(),
        );
        agents.dialog = Some(Arc::new(DialogAgent::new(client)));
    }

    if config.agents.sample_agent {
        agents.sample = Some(Arc::new(SampleAgent));
    }

    agents
}

//! Application state shared across all route handlers.
//!
//! AppState holds the injected store and agents. It is passed to handlers
//! via axum's State extractor.

use std::sync::Arc;
use std::time::Instant;

use relay_core::config::RelayConfig;
use relay_provider::Agent;
use relay_storage::HistoryStore;

pub const FILE_AGENT_PATH: &str = "/api/file-agent";
pub const DIALOG_AGENT_PATH: &str = "/api/sample-voiceflow-agent";
pub const SAMPLE_AGENT_PATH: &str = "/api/sample-postgres-agent";

/// The agents this process serves. `None` leaves the route unmounted.
#[derive(Clone, Default)]
pub struct AgentSet {
    pub file: Option<Arc<dyn Agent>>,
    pub dialog: Option<Arc<dyn Agent>>,
    pub sample: Option<Arc<dyn Agent>>,
}

impl AgentSet {
    /// Route path and agent for every configured agent.
    pub fn mounted(&self) -> Vec<(&'static str, Arc<dyn Agent>)> {
        [
            (FILE_AGENT_PATH, &self.file),
            (DIALOG_AGENT_PATH, &self.dialog),
            (SAMPLE_AGENT_PATH, &self.sample),
        ]
        .into_iter()
        .filter_map(|(path, agent)| agent.clone().map(|a| (path, a)))
        .collect()
    }
}

/// Shared application state.
///
/// All fields are cheap to clone across handler tasks.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    /// Conversation history store.
    pub history: Arc<dyn HistoryStore>,
    pub agents: AgentSet,
    /// Expected bearer token. `None` means the gate is misconfigured.
    pub api_token: Option<String>,
    /// Messages replayed to the provider per request.
    pub history_limit: usize,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: RelayConfig, history: Arc<dyn HistoryStore>, agents: AgentSet) -> Self {
        Self {
            api_token: config.auth.bearer_token.clone(),
            history_limit: config.history.limit,
            config: Arc::new(config),
            history,
            agents,
            start_time: Instant::now(),
        }
    }
}

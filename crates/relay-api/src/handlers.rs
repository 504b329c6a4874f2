//! Route handler functions for the agent endpoints.
//!
//! Every agent route runs the same turn: load recent history, persist the
//! user's message, call the provider once, persist the reply. What happens
//! when a step fails is decided by the agent's [`FailurePolicy`].

use std::sync::Arc;

use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use relay_core::types::{AgentRequest, AgentResponse, MessageBody, MessageType};
use relay_provider::{Agent, FailurePolicy};
use relay_storage::HistoryStore;

use crate::error::{ApiError, TurnError};
use crate::state::AppState;

/// Reply persisted in place of the provider's answer when a turn fails.
pub const APOLOGY: &str = "I apologize, but I encountered an error processing your request.";

/// Result of a completed turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Number of history messages replayed to the provider.
    pub history_len: usize,
    /// Id of the persisted reply.
    pub reply_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub agents: Vec<String>,
}

/// Run one agent turn against the shared history store.
///
/// The history window is read and checked before the user's message is
/// written, so the provider never sees the current query twice and a history
/// the agent cannot replay leaves only the failure record behind.
pub async fn run_turn(
    history: &dyn HistoryStore,
    history_limit: usize,
    agent: &dyn Agent,
    request: &AgentRequest,
) -> Result<TurnOutcome, TurnError> {
    let replayed = if agent.replays_history() {
        history.fetch_recent(&request.session_id, history_limit)?
    } else {
        Vec::new()
    };
    agent.check_history(&replayed)?;

    history.append(&request.session_id, &agent.user_message(request))?;

    let reply = agent.respond(&replayed, request).await?;
    let reply_id = history.append(&request.session_id, &reply)?;

    Ok(TurnOutcome {
        history_len: replayed.len(),
        reply_id,
    })
}

/// Best-effort apology append. A failure here is logged and dropped.
fn record_apology(history: &dyn HistoryStore, request: &AgentRequest, err: &TurnError) {
    let apology = MessageBody::new(MessageType::Ai, APOLOGY).with_data(json!({
        "error": err.to_string(),
        "request_id": request.request_id,
    }));

    if let Err(e) = history.append(&request.session_id, &apology) {
        tracing::error!(
            session_id = %request.session_id,
            error = %e,
            "Failed to record apology"
        );
    }
}

/// POST handler shared by every agent route. The agent is attached to
/// the route as an extension.
pub async fn agent_turn(
    State(state): State<AppState>,
    Extension(agent): Extension<Arc<dyn Agent>>,
    Json(request): Json<AgentRequest>,
) -> Result<Json<AgentResponse>, ApiError> {
    tracing::info!(
        agent = agent.name(),
        session_id = %request.session_id,
        request_id = %request.request_id,
        "Processing agent request"
    );

    match run_turn(
        state.history.as_ref(),
        state.history_limit,
        agent.as_ref(),
        &request,
    )
    .await
    {
        Ok(outcome) => {
            tracing::debug!(
                agent = agent.name(),
                history_len = outcome.history_len,
                reply_id = %outcome.reply_id,
                "Turn complete"
            );
            Ok(Json(AgentResponse { success: true }))
        }
        Err(err) => {
            tracing::error!(
                agent = agent.name(),
                session_id = %request.session_id,
                request_id = %request.request_id,
                error = %err,
                "Agent turn failed"
            );
            match agent.failure_policy() {
                FailurePolicy::Apologize => {
                    record_apology(state.history.as_ref(), &request, &err);
                    Ok(Json(AgentResponse { success: false }))
                }
                FailurePolicy::Propagate => Err(err.into()),
            }
        }
    }
}

/// GET /health - liveness plus the agents this process serves.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let agents = state
        .agents
        .mounted()
        .into_iter()
        .map(|(_, agent)| agent.name().to_string())
        .collect();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        agents,
    })
}

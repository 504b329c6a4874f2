//! Relay API crate - axum HTTP server for the agent endpoints.
//!
//! Each agent is mounted on its own `POST` route behind the bearer-token
//! gate. Handlers run the shared turn skeleton (history, persist, provider,
//! persist) and answer `{success}`; failures are recorded in the session
//! transcript rather than surfaced as HTTP errors.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::{ApiError, TurnError};
pub use routes::create_router;
pub use state::{AgentSet, AppState};

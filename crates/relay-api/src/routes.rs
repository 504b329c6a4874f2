//! Router setup with all API routes and middleware.
//!
//! Configures the axum Router with CORS, tracing, the body limit, and one
//! `POST` route per configured agent.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Extension, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use relay_core::config::ServerConfig;
use relay_core::error::RelayError;

use crate::handlers;
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let server = &state.config.server;
    let body_limit = server.body_limit_bytes;
    let cors_permissive = server.cors_permissive;

    let public_routes = Router::new().route("/health", get(handlers::health));

    let mut agent_routes = Router::new();
    for (path, agent) in state.agents.mounted() {
        tracing::debug!(path, agent = agent.name(), "Mounting agent route");
        agent_routes = agent_routes.route(path, post(handlers::agent_turn).layer(Extension(agent)));
    }

    let mut router = public_routes;
    if !state.agents.mounted().is_empty() {
        // route_layer panics on a router without routes.
        router = router.merge(agent_routes.route_layer(
            axum::middleware::from_fn_with_state(state.clone(), crate::auth::require_auth),
        ));
    }

    let mut router = router
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http());

    if cors_permissive {
        // Any origin, credentials allowed; mirrors the request origin.
        router = router.layer(CorsLayer::very_permissive());
    }

    router.with_state(state)
}

/// Bind the configured address and serve until Ctrl-C.
pub async fn start_server(server: &ServerConfig, state: AppState) -> Result<(), RelayError> {
    let addr = format!("{}:{}", server.host, server.port);
    let router = create_router(state);

    tracing::info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RelayError::Config(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

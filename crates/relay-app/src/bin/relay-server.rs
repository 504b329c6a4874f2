use std::sync::Arc;

use clap::Parser;

use relay_api::routes::start_server;
use relay_api::AppState;
use relay_app::cli::ServerArgs;
use relay_app::setup::{build_agents, init_tracing, load_config, open_database};
use relay_storage::MessageRepository;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = ServerArgs::parse();
    init_tracing(args.common.log_level.as_deref());

    tracing::info!("Starting relay-server v{}", env!("CARGO_PKG_VERSION"));

    let mut config = load_config(&args.common);
    args.apply(&mut config);

    if config.auth.bearer_token.is_none() {
        tracing::warn!("API_BEARER_TOKEN not set; agent routes will answer 500");
    }

    let db = open_database(&config)?;
    let history = Arc::new(MessageRepository::new(db));

    let http = reqwest::Client::new();
    let agents = build_agents(&config, &http);

    let server = config.server.clone();
    let state = AppState::new(config, history, agents);
    start_server(&server, state).await?;

    Ok(())
}

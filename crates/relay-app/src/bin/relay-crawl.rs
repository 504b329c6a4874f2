use std::sync::Arc;

use clap::Parser;

use relay_app::cli::CrawlArgs;
use relay_app::setup::{init_tracing, load_config, open_database};
use relay_crawler::{CrawlSettings, Crawler, N8nCatalog, OpenAiCompletion, OpenAiEmbedder};
use relay_provider::OpenAiClient;
use relay_storage::CatalogRepository;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CrawlArgs::parse();
    init_tracing(args.common.log_level.as_deref());

    let mut config = load_config(&args.common);
    args.apply(&mut config);

    if config.openai.api_key.is_none() {
        return Err("OPENAI_API_KEY is required for crawling".into());
    }

    let db = open_database(&config)?;
    let catalog = Arc::new(CatalogRepository::new(db));

    let http = reqwest::Client::new();
    let openai = OpenAiClient::with_http(
        http.clone(),
        config.openai.base_url.clone(),
        config.openai.api_key.clone(),
    );
    let crawler_config = &config.crawler;

    let crawler = Crawler::new(
        Arc::new(N8nCatalog::with_http(http, crawler_config.catalog_base_url.clone())),
        Arc::new(OpenAiCompletion::new(openai.clone(), crawler_config.llm_model.clone())),
        Arc::new(OpenAiEmbedder::new(
            openai,
            crawler_config.embedding_model.clone(),
            Some(crawler_config.embedding_dimensions),
        )),
        catalog.clone(),
        CrawlSettings::from(crawler_config),
    );

    let report = crawler.run().await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    tracing::info!(total = catalog.count()?, "Catalog size");

    Ok(())
}

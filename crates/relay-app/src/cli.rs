//! CLI argument definitions for the relay binaries.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use std::path::PathBuf;

use clap::{Args, Parser};

use relay_core::config::RelayConfig;

/// Default config file, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "relay.toml";

/// Flags shared by both binaries.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// SQLite database file.
    #[arg(short = 'd', long = "database")]
    pub database: Option<PathBuf>,

    /// Log level or filter directive (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
}

impl CommonArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > RELAY_CONFIG env var > ./relay.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("RELAY_CONFIG") {
            if !p.is_empty() {
                return PathBuf::from(p);
            }
        }
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }

    fn apply(&self, config: &mut RelayConfig) {
        if let Some(ref path) = self.database {
            config.storage.database_path = path.to_string_lossy().to_string();
        }
    }
}

/// Agent relay HTTP server.
#[derive(Parser, Debug)]
#[command(name = "relay-server", version, about)]
pub struct ServerArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// API server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,
}

impl ServerArgs {
    /// Overlay CLI flags onto a config already merged with the environment.
    pub fn apply(&self, config: &mut RelayConfig) {
        self.common.apply(config);
        if let Some(port) = self.port {
            config.server.port = port;
        }
    }
}

/// Workflow-template catalog crawler.
#[derive(Parser, Debug)]
#[command(name = "relay-crawl", version, about)]
pub struct CrawlArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Highest template ID to try.
    #[arg(long = "max-id")]
    pub max_id: Option<u64>,

    /// Pause between IDs, in milliseconds.
    #[arg(long = "delay-ms")]
    pub delay_ms: Option<u64>,
}

impl CrawlArgs {
    pub fn apply(&self, config: &mut RelayConfig) {
        self.common.apply(config);
        if let Some(max_id) = self.max_id {
            config.crawler.max_id = max_id;
        }
        if let Some(delay_ms) = self.delay_ms {
            config.crawler.delay_ms = delay_ms;
        }
    }
}

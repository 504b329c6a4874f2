//! Relay storage crate - SQLite persistence for conversations and the
//! workflow catalog.
//!
//! Provides a WAL-mode SQLite database with migrations, the
//! conversation-history adapter used by every agent endpoint, and the
//! catalog repository the crawler upserts into.

pub mod catalog;
pub mod db;
pub mod history;
pub mod migrations;

pub use catalog::CatalogRepository;
pub use db::Database;
pub use history::{HistoryStore, MessageRepository, DEFAULT_HISTORY_LIMIT};

//! Provider adapters for the relay agents.
//!
//! Wraps the third-party APIs the agents talk to (an OpenAI-compatible
//! chat/embeddings API and the Voiceflow dialog API), converts stored
//! history into each vendor's message shape, and defines the [`Agent`]
//! trait the HTTP layer drives.

pub mod agent;
pub mod dialog;
pub mod error;
pub mod files;
pub mod openai;

pub use agent::{Agent, DialogAgent, FailurePolicy, FileAgent, SampleAgent};
pub use dialog::{parse_dialog_input, DialogAction, DialogClient, DialogInput};
pub use error::ProviderError;
pub use files::{files_to_context, with_file_context};
pub use openai::{ChatMessage, OpenAiClient};

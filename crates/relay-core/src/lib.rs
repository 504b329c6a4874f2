//! Shared foundation for the agent relay services.
//!
//! Holds the configuration model, the top-level error type, and the
//! message/request types every other crate speaks.

pub mod config;
pub mod error;
pub mod types;

pub use config::RelayConfig;
pub use error::{RelayError, Result};
pub use types::*;

//! Composition roots for the relay binaries.
//!
//! `relay-server` serves the agent endpoints; `relay-crawl` runs the
//! catalog crawler once. Both share CLI parsing, config resolution and
//! logging setup from this crate.

pub mod cli;
pub mod setup;

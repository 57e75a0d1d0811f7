//! Focus tracker CLI library.
//!
//! Wires the core accounting engine to a real host: events arrive as JSON
//! lines on stdin, pending minutes persist in a local ledger store, and
//! accumulated durations flush to the remote collector on an interval.

mod cli;
pub mod commands;
mod config;
pub mod engine;
pub mod host;

pub use cli::{Cli, Commands};
pub use config::Config;

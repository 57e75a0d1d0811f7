//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Focus-time tracker.
///
/// Attributes continuous focus time to navigated domains and periodically
/// reports accumulated minutes to a remote collector.
#[derive(Debug, Parser)]
#[command(name = "ft", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the tracking engine, reading host events from stdin.
    Run,

    /// Show pending (not yet flushed) usage from the local ledger.
    Status {
        /// Emit raw entries as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Flush the persisted ledger to the collector once.
    Flush,
}

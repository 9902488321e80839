//! CLI definitions for Moltbunker.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Moltbunker CLI.
#[derive(Parser)]
#[command(name = "moltbunker")]
#[command(about = "Moltbunker event streams, exec terminals and wallet signing")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (default: ~/.config/moltbunker/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Also write daily-rotated logs to this directory
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    /// Override the API base URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Stream channel updates as JSON lines
    Events {
        /// Channel to subscribe to (repeatable)
        #[arg(short = 'C', long = "channel", required = true)]
        channels: Vec<String>,

        /// Bearer token (default: configured API key)
        #[arg(long)]
        token: Option<String>,
    },

    /// Open an interactive terminal in a container
    Exec {
        /// Container ID
        container_id: String,

        /// Terminal columns
        #[arg(long)]
        cols: Option<u16>,

        /// Terminal rows
        #[arg(long)]
        rows: Option<u16>,

        /// Bearer token (default: configured API key)
        #[arg(long)]
        token: Option<String>,
    },

    /// Sign a message with the configured wallet key
    Sign {
        /// Message to sign
        message: String,
    },

    /// Show which credentials are in use
    Whoami,

    /// Validate the configuration
    Check,
}

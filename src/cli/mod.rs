//! CLI module for Healthbot.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Healthbot - a healthcare chat assistant
///
/// Answers health questions with a language model, backed by web search for
/// sources and video search for related YouTube videos.
#[derive(Parser, Debug)]
#[command(name = "healthbot")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive chat session
    Chat {
        /// Resume a stored session (sqlite transcript backend)
        #[arg(short, long)]
        session: Option<String>,

        /// Model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Ask a single question in a fresh session
    Ask {
        /// The question to ask
        question: String,

        /// Model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// List stored sessions, or replay one
    History {
        /// Session to replay
        session_id: Option<String>,
    },

    /// Check API keys, storage and configuration
    Doctor,

    /// Start HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

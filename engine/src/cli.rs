//! CLI interface for DeepDive
//!
//! This module provides the command-line interface using clap's derive API.
//! It defines all commands and global flags.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// DeepDive research engine
///
/// Runs multi-pass deep research over a query against a local or cloud LLM
/// provider, keeps a history of results and lets earlier findings be fed back
/// into new runs as memory.
#[derive(Parser, Debug)]
#[command(name = "deepdive")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Research a query. Ctrl-C stops the run.
    Research(ResearchArgs),

    /// Show research history
    History {
        /// Number of results to show (default: from config)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show one stored result in full
    Show {
        /// Result ID
        id: String,
    },

    /// Delete a stored result
    Delete {
        /// Result ID
        id: String,
    },

    /// Manage stored memory contexts
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },

    /// List configured providers and their health
    Providers,

    /// Show the depth tiers and their pass counts
    Depths,

    /// Manage provider API keys
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
}

#[derive(clap::Args, Debug)]
pub struct ResearchArgs {
    /// The research query
    pub query: String,

    /// Depth tier: quick, standard, deep, exhaustive
    #[arg(short, long)]
    pub depth: Option<String>,

    /// Provider id (ollama, openai, anthropic, gemini)
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Model id; defaults to the provider's configured model
    #[arg(short, long)]
    pub model: Option<String>,

    /// Token ceiling for each generation call
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Sampling temperature in [0, 2]
    #[arg(short, long)]
    pub temperature: Option<f32>,

    /// Memory context ID to inject (repeatable)
    #[arg(long = "memory", value_name = "ID")]
    pub memories: Vec<String>,

    /// Also store the answer as a memory context
    #[arg(long)]
    pub remember: bool,
}

/// Memory context actions
#[derive(Subcommand, Debug)]
pub enum MemoryAction {
    /// List stored memory contexts
    List,

    /// Store a past result as a memory context
    Add {
        /// Result ID
        result_id: String,
    },

    /// Remove a memory context
    Remove {
        /// Memory context ID
        id: String,
    },

    /// Remove every memory context of the session
    Clear,
}

/// API key actions
#[derive(Subcommand, Debug)]
pub enum KeyAction {
    /// Store a provider API key in the OS keychain
    Set {
        /// Provider id (openai, anthropic, gemini)
        provider: String,
    },
}

//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Saldo - Bank statement dashboard
#[derive(Parser)]
#[command(name = "saldo")]
#[command(about = "Turn bank statement PDFs into a categorized dashboard", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Secrets/config file (defaults to SALDO_CONFIG or ~/.config/saldo/secrets.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Store location: a SQLite path or a PostgREST base URL
    ///
    /// Overrides SALDO_DATABASE_URL and the config file.
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Model backend: gemini, openai_compatible or mock
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// Model name passed to the backend
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create or migrate the local SQLite store
    Init,

    /// Extract and parse a statement without labeling or saving
    Parse {
        /// Statement PDF
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Run the full pipeline and replace the stored records
    Process {
        /// Statement PDF
        #[arg(short, long)]
        file: PathBuf,

        /// Skip remote classification; every line gets the fallback label
        #[arg(long)]
        no_classify: bool,

        /// Seconds to pause after each classified line
        #[arg(long)]
        throttle: Option<u64>,

        /// Print progress events as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Show metrics, category proportions, daily flow and the detail table
    Dashboard {
        /// Only show these categories in the detail table (repeatable)
        #[arg(short, long)]
        category: Vec<String>,
    },

    /// List stored records, newest first
    Transactions {
        /// Only these categories (repeatable)
        #[arg(short, long)]
        category: Vec<String>,

        /// Maximum rows to print
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Export the detail table as CSV
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only these categories (repeatable)
        #[arg(short, long)]
        category: Vec<String>,
    },

    /// Show resolved settings and where each came from
    Config,

    /// Show the classification prompt and its override location
    Prompt {
        #[command(subcommand)]
        action: Option<PromptAction>,
    },

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Directory containing static files to serve (e.g., ui/dist)
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum PromptAction {
    /// Print the active prompt
    Show,
    /// Print the override directory
    Path,
}

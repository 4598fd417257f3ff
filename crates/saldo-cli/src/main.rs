//! Saldo CLI - Bank statement dashboard
//!
//! Usage:
//!   saldo init                    Create the local store
//!   saldo process --file X.pdf    Parse, label and store a statement
//!   saldo dashboard               Show the dashboard
//!   saldo serve --port 3000       Start web server

mod cli;
mod commands;


use anyhow::{Context, Result};
use clap::Parser;
use saldo_core::{Overrides, Settings};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let throttle_secs = match &cli.command {
        Commands::Process { throttle, .. } => *throttle,
        _ => None,
    };
    let overrides = Overrides {
        database_url: cli.db.clone(),
        ai_backend: cli.backend.clone(),
        model: cli.model.clone(),
        throttle_secs,
    };
    let settings = Settings::load(&overrides, cli.config.as_deref())
        .context("Failed to load settings")?;

    match cli.command {
        Commands::Init => commands::cmd_init(&settings),
        Commands::Parse { file } => commands::cmd_parse(&file, &settings),
        Commands::Process {
            file,
            no_classify,
            json,
            ..
        } => {
            let store = commands::open_store(&settings)?;
            let ai = if no_classify {
                None
            } else {
                Some(commands::open_ai(&settings)?)
            };
            commands::cmd_process(&store, ai, &settings, &file, json)
                .await
                .map(|_| ())
        }
        Commands::Dashboard { category } => {
            let store = commands::open_store(&settings)?;
            commands::cmd_dashboard(&store, &category).await
        }
        Commands::Transactions { category, limit } => {
            let store = commands::open_store(&settings)?;
            commands::cmd_transactions(&store, &category, limit).await
        }
        Commands::Export { output, category } => {
            let store = commands::open_store(&settings)?;
            commands::cmd_export(&store, output.as_deref(), &category)
                .await
                .map(|_| ())
        }
        Commands::Config => commands::cmd_config(&settings),
        Commands::Prompt { action } => match action {
            None | Some(PromptAction::Show) => commands::cmd_prompt_show(),
            Some(PromptAction::Path) => commands::cmd_prompt_path(),
        },
        Commands::Serve {
            port,
            host,
            static_dir,
        } => commands::cmd_serve(settings, &host, port, static_dir.as_deref()).await,
    }
}

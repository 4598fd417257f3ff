//! Server command implementation

use std::path::Path;

use anyhow::{Context, Result};
use saldo_core::Settings;

pub async fn cmd_serve(
    settings: Settings,
    host: &str,
    port: u16,
    static_dir: Option<&Path>,
) -> Result<()> {
    println!("🚀 Starting Saldo web server...");
    println!("   Store: {}", settings.database_url);
    println!("   Model: {} ({})", settings.model, settings.ai_backend.as_str());
    println!("   Listening: http://{}:{}", host, port);
    if let Some(dir) = static_dir {
        println!("   Static files: {}", dir.display());
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let static_dir_str = static_dir
        .map(|p| p.to_str().context("static_dir path must be valid UTF-8"))
        .transpose()?;

    let allowed_origins: Vec<String> = std::env::var("SALDO_ALLOWED_ORIGINS")
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let config = saldo_server::ServerConfig { allowed_origins };
    saldo_server::serve(settings, host, port, static_dir_str, config).await?;

    Ok(())
}

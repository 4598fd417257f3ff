//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_store` - Shared utility to connect the configured store
//! - `open_ai` - Shared utility to build the configured model backend
//! - `cmd_init` - Create or migrate the local store

use anyhow::{bail, Context, Result};
use saldo_core::{AIClient, Database, Settings, StoreClient};

/// Connect the store named in settings (SQLite path or PostgREST URL)
pub fn open_store(settings: &Settings) -> Result<StoreClient> {
    StoreClient::connect(settings).context("Failed to open store")
}

/// Build the model backend, failing when it needs a key that is missing
pub fn open_ai(settings: &Settings) -> Result<AIClient> {
    match AIClient::from_settings(settings) {
        Some(ai) => Ok(ai),
        None => bail!(
            "No model API key configured. Set SALDO_MODEL_API_KEY (or GEMINI_KEY), \
             or use --no-classify"
        ),
    }
}

pub fn cmd_init(settings: &Settings) -> Result<()> {
    if settings.uses_rest_store() {
        println!("ℹ️  {} is a hosted table; nothing to initialize.", settings.database_url);
        println!("   The table must already have the transacoes columns.");
        return Ok(());
    }

    println!("🔧 Initializing store at {}...", settings.database_url);

    let db = Database::open(&settings.database_url, settings.database_key.as_deref())
        .context("Failed to open database")?;
    let count = db.count_transactions().context("Failed to read store")?;

    if db.is_encrypted() {
        println!("   🔒 Encryption: ENABLED (SALDO_DATABASE_KEY)");
    } else {
        println!("   ⚠️  Encryption: DISABLED (set SALDO_DATABASE_KEY to encrypt)");
    }
    println!("   Records: {}", count);

    println!("✅ Store ready!");
    println!();
    println!("Next steps:");
    println!("  1. Process a statement: saldo process --file extrato.pdf");
    println!("  2. Start web UI: saldo serve");

    Ok(())
}

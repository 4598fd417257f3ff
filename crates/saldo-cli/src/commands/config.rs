//! Settings and prompt inspection commands

use anyhow::{Context, Result};
use saldo_core::prompts::default_prompts_dir;
use saldo_core::{Prompt, PromptId, Settings};

/// Print every setting with its source; secrets are masked
pub fn cmd_config(settings: &Settings) -> Result<()> {
    println!();
    println!("⚙️  Saldo Settings");
    println!("   ─────────────────────────────────────────────────────────────");

    for (key, value, source) in settings.describe() {
        println!("   {:<14} {:<40} {}", key, value, source);
    }

    println!();
    println!(
        "   Retry: {} attempts, {}s backoff",
        settings.retry.max_attempts,
        settings.retry.backoff.as_secs()
    );
    println!("   Parser months: {}", settings.parser.months.len());
    if settings.model_api_key.is_none() {
        println!();
        println!("   💡 Tip: Set SALDO_MODEL_API_KEY (or GEMINI_KEY) to enable classification");
    }

    Ok(())
}

/// Show the classification prompt in effect
pub fn cmd_prompt_show() -> Result<()> {
    let prompt = Prompt::load(PromptId::ClassifyTransaction, default_prompts_dir().as_ref())
        .context("Failed to load prompt")?;

    println!("Prompt: {}", prompt.metadata.id);
    println!("Version: {}", prompt.metadata.version);
    match prompt.override_path {
        Some(ref path) => println!("Source: Override ({})", path.display()),
        None => println!("Source: Default"),
    }

    println!();
    println!("--- Content ---");
    println!("{}", prompt.content);

    Ok(())
}

/// Show the path where prompt overrides should be placed
pub fn cmd_prompt_path() -> Result<()> {
    match default_prompts_dir() {
        Some(path) => {
            let file = path.join(format!("{}.md", PromptId::ClassifyTransaction.as_str()));
            println!("{}", file.display());

            if !path.exists() {
                eprintln!();
                eprintln!("Note: This directory does not exist yet.");
                eprintln!("Create it and copy the default prompt there to customize it.");
            }
        }
        None => {
            eprintln!("Could not determine prompts directory.");
            eprintln!("The data directory is not available on this system.");
        }
    }

    Ok(())
}

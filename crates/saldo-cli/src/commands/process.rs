//! Statement command implementations (parse, process)

use std::path::Path;

use anyhow::{Context, Result};
use saldo_core::extract::extract_pages;
use saldo_core::statement::parse_pages;
use saldo_core::{
    AIClient, CategoryLabeler, ProcessReport, ProgressEvent, ProgressSink, Settings,
    StatementProcessor, TransactionStore,
};

use super::{format_brl, truncate};

/// Prints progress as human-readable lines
pub struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::PageStarted { page, total_pages } => {
                println!("   📄 Page {}/{}", page, total_pages);
            }
            ProgressEvent::Classifying { description, .. } => {
                println!("      🤖 Classifying: {}", truncate(&description, 50));
            }
            ProgressEvent::PageFinished { found, .. } => {
                if found > 0 {
                    println!("      {} transactions", found);
                }
            }
            ProgressEvent::Saving { records } => {
                println!("   💾 Saving {} records...", records);
            }
            ProgressEvent::Done { .. } => {}
        }
    }
}

/// Prints each progress event as a JSON line
pub struct JsonProgress;

impl ProgressSink for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        if let Ok(line) = serde_json::to_string(&event) {
            println!("{}", line);
        }
    }
}

fn read_pdf(file: &Path) -> Result<Vec<u8>> {
    std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))
}

/// Dry run: extract and parse, print what would be stored
pub fn cmd_parse(file: &Path, settings: &Settings) -> Result<()> {
    let bytes = read_pdf(file)?;
    let pages = extract_pages(&bytes).context("Failed to extract statement text")?;
    let lines = parse_pages(&pages, &settings.parser);

    println!();
    println!(
        "🔎 {} ({} pages, {} transactions)",
        file.display(),
        pages.len(),
        lines.len()
    );
    println!("   ─────────────────────────────────────────────────────────────");

    for line in &lines {
        println!(
            "   {} │ {:>14} │ {}",
            line.date,
            format_brl(line.amount),
            truncate(&line.description, 40)
        );
    }

    if lines.is_empty() {
        println!("   No transaction lines recognised.");
    }

    Ok(())
}

/// Full pipeline: extract, parse, label, replace the stored batch
///
/// With `ai` set to None every line gets the fallback label.
pub async fn cmd_process<S: TransactionStore>(
    store: &S,
    ai: Option<AIClient>,
    settings: &Settings,
    file: &Path,
    json: bool,
) -> Result<ProcessReport> {
    let bytes = read_pdf(file)?;

    let labeler = match ai {
        Some(ai) => Some(
            CategoryLabeler::from_settings(ai, settings).context("Failed to load prompt")?,
        ),
        None => None,
    };

    if !json {
        println!("🚀 Processing {}...", file.display());
        match labeler {
            Some(ref l) => println!("   🤖 Model: {}", l.generator().kind().as_str()),
            None => println!("   ⚠️  Classification skipped (--no-classify)"),
        }
    }

    let processor = StatementProcessor::new(store, labeler, settings);
    let report = if json {
        processor.process_pdf(&bytes, &JsonProgress).await
    } else {
        processor.process_pdf(&bytes, &ConsoleProgress).await
    }
    .context("Failed to process statement")?;

    if !json {
        println!();
        println!("✅ Stored {} transactions", report.transactions);
        println!("   Income:  {}", format_brl(report.income));
        println!("   Expense: {}", format_brl(report.expense));
        if report.fallback_labels > 0 {
            println!(
                "   ⚠️  {} lines labeled \"Outros\" (unclassified)",
                report.fallback_labels
            );
        }
        if report.empty_pages > 0 {
            println!("   {} pages had no text", report.empty_pages);
        }
    }

    Ok(report)
}

//! CSV export command

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};
use saldo_core::export::write_transactions_csv;
use saldo_core::reports::detail_table;
use saldo_core::TransactionStore;

/// Write the detail table (filtered, newest first) as CSV
///
/// Returns the number of rows written. Without an output path the CSV goes
/// to stdout.
pub async fn cmd_export<S: TransactionStore>(
    store: &S,
    output: Option<&Path>,
    categories: &[String],
) -> Result<usize> {
    let records = store.fetch_all().await.context("Failed to fetch records")?;
    let rows = detail_table(&records, categories);

    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let count = write_transactions_csv(&rows, BufWriter::new(file))
                .context("Failed to write CSV")?;
            eprintln!("✅ Exported {} transactions to {}", count, path.display());
            Ok(count)
        }
        None => {
            let count = write_transactions_csv(&rows, io::stdout().lock())
                .context("Failed to write CSV")?;
            Ok(count)
        }
    }
}

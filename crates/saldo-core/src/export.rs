//! CSV export of the detail table

use std::io::Write;

use serde::Serialize;

use crate::error::Result;
use crate::models::Transaction;

/// One exported row (the detail table's columns)
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    date: String,
    description: &'a str,
    category: &'a str,
    amount: String,
    source: &'a str,
}

/// Write rows as CSV with a header, returning the number of data rows
pub fn write_transactions_csv<W: Write>(rows: &[Transaction], writer: W) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    for tx in rows {
        wtr.serialize(ExportRow {
            date: tx.date.to_string(),
            description: &tx.description,
            category: &tx.category,
            amount: format!("{:.2}", tx.amount),
            source: &tx.source,
        })?;
    }
    // An empty export still gets a header line
    if rows.is_empty() {
        wtr.write_record(["date", "description", "category", "amount", "source"])?;
    }
    wtr.flush()?;
    Ok(rows.len())
}

/// Render rows as a CSV string
pub fn transactions_csv(rows: &[Transaction]) -> Result<String> {
    let mut buf = Vec::new();
    write_transactions_csv(rows, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

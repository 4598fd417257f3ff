//! Transaction operations

use rusqlite::params;

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{NewTransaction, Transaction};

const INSERT_SQL: &str = r#"
    INSERT INTO transactions (date, description, amount, source, category, note)
    VALUES (?, ?, ?, ?, ?, ?)
"#;

fn insert_all(conn: &rusqlite::Connection, records: &[NewTransaction]) -> Result<usize> {
    let mut stmt = conn.prepare_cached(INSERT_SQL)?;
    for tx in records {
        stmt.execute(params![
            tx.date.to_string(),
            tx.description,
            tx.amount,
            tx.source,
            tx.category,
            tx.note,
        ])?;
    }
    Ok(records.len())
}

impl Database {
    /// Remove every transaction, returning how many were deleted
    pub fn delete_all_transactions(&self) -> Result<usize> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM transactions", [])?;
        Ok(deleted)
    }

    /// Append transactions in order (one SQLite transaction for the batch)
    pub fn insert_transactions(&self, records: &[NewTransaction]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let inserted = insert_all(&tx, records)?;
        tx.commit()?;
        Ok(inserted)
    }

    /// Delete everything and insert `records`, committing both or neither
    pub fn replace_transactions(&self, records: &[NewTransaction]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM transactions", [])?;
        let inserted = insert_all(&tx, records)?;
        tx.commit()?;
        Ok(inserted)
    }

    /// All transactions in insertion order
    pub fn list_transactions(&self) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, date, description, amount, source, category, note, created_at
             FROM transactions ORDER BY id",
        )?;

        let rows = stmt.query_map([], |row| Self::row_to_transaction(row))?;
        let mut transactions = Vec::new();
        for row in rows {
            transactions.push(row?);
        }
        Ok(transactions)
    }

    /// Count stored transactions
    pub fn count_transactions(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Column order: id, date, description, amount, source, category, note, created_at
    pub(crate) fn row_to_transaction(row: &rusqlite::Row) -> rusqlite::Result<Transaction> {
        let date_str: String = row.get(1)?;
        let date = chrono::NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
        })?;
        let created_at_str: Option<String> = row.get(7)?;
        Ok(Transaction {
            id: row.get(0)?,
            date,
            description: row.get(2)?,
            amount: row.get(3)?,
            source: row.get(4)?,
            category: row.get(5)?,
            note: row.get(6)?,
            created_at: created_at_str.as_deref().and_then(parse_datetime),
        })
    }
}

//! Statement text parser
//!
//! Turns the plain text of a bank statement into transaction lines. The
//! statement layout is a sequence of date headers (`05 JAN 2024`) each followed
//! by the lines booked on that day (`Compra Supermercado 1.234,56`).
//!
//! Parsing is a fold of [`ParserState::step`] over the lines of a page. The
//! state is reset at every page boundary, so a transaction line that appears on
//! a page before that page's first date header is dropped.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Matches `DD MMM YYYY` anywhere in a line
fn date_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{2})\s([A-Z]{3})\s(\d{4})").expect("valid regex"))
}

/// Matches `<description> <amount>` with a Brazilian-format trailing amount
fn transaction_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.+?)\s+([\d.]*,\d{2})$").expect("valid regex"))
}

/// Heuristics that drive the parser
///
/// All matching data lives here rather than in the parsing code so it can be
/// tuned from the `[parser]` table of the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserRules {
    /// Three-letter month abbreviation -> month number
    pub months: BTreeMap<String, u32>,
    /// Month used when a header's abbreviation is not in `months`
    pub unknown_month: u32,
    /// Case-sensitive phrases marking summary lines (balances, totals)
    pub exclusions: Vec<String>,
    /// Lower-case keywords that force an amount negative
    pub outgoing: Vec<String>,
    /// Lower-case keywords that force an amount positive
    pub incoming: Vec<String>,
}

impl Default for ParserRules {
    fn default() -> Self {
        let months = [
            "JAN", "FEV", "MAR", "ABR", "MAI", "JUN", "JUL", "AGO", "SET", "OUT", "NOV", "DEZ",
        ]
        .iter()
        .zip(1u32..)
        .map(|(abbr, n)| (abbr.to_string(), n))
        .collect();

        Self {
            months,
            unknown_month: 1,
            exclusions: vec!["Saldo".into(), "Total de".into()],
            outgoing: vec![
                "compra".into(),
                "envio".into(),
                "enviada".into(),
                "pagamento".into(),
                "saída".into(),
            ],
            incoming: vec!["resgate".into(), "recebida".into(), "depósito".into()],
        }
    }
}

impl ParserRules {
    fn month(&self, abbr: &str) -> u32 {
        self.months.get(abbr).copied().unwrap_or(self.unknown_month)
    }

    fn is_excluded(&self, description: &str) -> bool {
        self.exclusions
            .iter()
            .any(|phrase| description.contains(phrase.as_str()))
    }

    /// Apply the keyword sign override to a parsed amount
    pub fn signed_amount(&self, description: &str, amount: f64) -> f64 {
        let lower = description.to_lowercase();
        if self.outgoing.iter().any(|k| lower.contains(k.as_str())) {
            -amount.abs()
        } else if self.incoming.iter().any(|k| lower.contains(k.as_str())) {
            amount.abs()
        } else {
            amount
        }
    }
}

/// A transaction line recognised in statement text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedLine {
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
}

/// Parser state carried from one line to the next within a page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserState {
    /// Date of the most recent header on this page
    pub current_date: Option<NaiveDate>,
}

impl ParserState {
    /// Consume one line, returning the next state and the transaction (if any)
    pub fn step(&self, line: &str, rules: &ParserRules) -> (ParserState, Option<ParsedLine>) {
        let line = line.trim();
        if line.is_empty() {
            return (*self, None);
        }

        // Header lines are consumed even when the date is not a real date
        if let Some(caps) = date_header_re().captures(line) {
            let day: u32 = caps[1].parse().unwrap_or(0);
            let year: i32 = caps[3].parse().unwrap_or(0);
            let month = rules.month(&caps[2]);
            let date = NaiveDate::from_ymd_opt(year, month, day);
            if date.is_none() {
                trace!(line, "Date header is not a calendar date, clearing current date");
            }
            return (ParserState { current_date: date }, None);
        }

        let Some(caps) = transaction_re().captures(line) else {
            trace!(line, "Skipping non-transaction line");
            return (*self, None);
        };

        let Some(date) = self.current_date else {
            trace!(line, "Skipping transaction line before any date header");
            return (*self, None);
        };

        let description = caps[1].trim();
        if description.is_empty() || rules.is_excluded(description) {
            trace!(line, "Skipping summary line");
            return (*self, None);
        }

        let Some(amount) = parse_amount(&caps[2]) else {
            trace!(line, "Skipping line with unparseable amount");
            return (*self, None);
        };

        let line = ParsedLine {
            date,
            description: description.to_string(),
            amount: rules.signed_amount(description, amount),
        };
        (*self, Some(line))
    }
}

/// Parse a `1.234,56`-style amount
pub fn parse_amount(text: &str) -> Option<f64> {
    let normalized = text.replace('.', "").replace(',', ".");
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse the lines of a single page, starting from a fresh state
pub fn parse_page(text: &str, rules: &ParserRules) -> Vec<ParsedLine> {
    let mut state = ParserState::default();
    let mut lines = Vec::new();
    for raw in text.lines() {
        let (next, parsed) = state.step(raw, rules);
        state = next;
        lines.extend(parsed);
    }
    lines
}

/// Parse every page in order
pub fn parse_pages<S: AsRef<str>>(pages: &[S], rules: &ParserRules) -> Vec<ParsedLine> {
    pages
        .iter()
        .filter(|page| !page.as_ref().trim().is_empty())
        .flat_map(|page| parse_page(page.as_ref(), rules))
        .collect()
}

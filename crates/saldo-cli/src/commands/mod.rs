//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Store/backend setup (open_store, open_ai) and `init`
//! - `process` - Statement commands (parse dry run, full pipeline)
//! - `dashboard` - Dashboard and transaction listing
//! - `export` - CSV export of the detail table
//! - `config` - Resolved settings and the classification prompt
//! - `serve` - Web server command

pub mod config;
pub mod core;
pub mod dashboard;
pub mod export;
pub mod process;
pub mod serve;

// Re-export command functions for main.rs
pub use config::*;
pub use core::*;
pub use dashboard::*;
pub use export::*;
pub use process::*;
pub use serve::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Format an amount as Brazilian currency (`R$ 1.234,56`, `-R$ 12,50`)
pub fn format_brl(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::new();
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}R$ {},{:02}", sign, grouped, cents % 100)
}

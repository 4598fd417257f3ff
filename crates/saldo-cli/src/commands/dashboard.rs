//! Dashboard and transaction listing commands

use anyhow::Result;
use saldo_core::reports::detail_table;
use saldo_core::{fetch_for_display, Dashboard, Transaction, TransactionStore};

use super::{format_brl, truncate};

const BAR_WIDTH: usize = 30;

fn print_rows(rows: &[Transaction], limit: usize) {
    for tx in rows.iter().take(limit) {
        let amount_str = if tx.amount < 0.0 {
            format!("\x1b[31m{:>14}\x1b[0m", format_brl(tx.amount)) // Red for expenses
        } else {
            format!("\x1b[32m{:>14}\x1b[0m", format_brl(tx.amount)) // Green for income
        };

        println!(
            "   {} │ {} │ {:<14} │ {}",
            tx.date,
            amount_str,
            truncate(&tx.category, 14),
            truncate(&tx.description, 36)
        );
    }
    if rows.len() > limit {
        println!("   ... {} more", rows.len() - limit);
    }
}

pub async fn cmd_dashboard<S: TransactionStore>(store: &S, categories: &[String]) -> Result<()> {
    let records = fetch_for_display(store).await;
    let dashboard = Dashboard::build(&records, categories);

    println!();
    println!("╭─────────────────────────────────────────╮");
    println!("│           💰 Saldo Dashboard            │");
    println!("╰─────────────────────────────────────────╯");
    println!();

    if dashboard.is_empty {
        println!("  No records yet. Process a statement with:");
        println!("    saldo process --file extrato.pdf");
        return Ok(());
    }

    let summary = &dashboard.summary;
    println!("  Entradas:     {}", format_brl(summary.income));
    println!("  Saídas:       {}", format_brl(summary.expense));
    println!("  Saldo:        {}", format_brl(summary.net));
    println!("  Transactions: {}", summary.transaction_count);

    if !dashboard.expenses_by_category.is_empty() {
        println!();
        println!("  📊 Expenses by category");
        for slice in &dashboard.expenses_by_category {
            let filled = ((slice.percentage / 100.0) * BAR_WIDTH as f64).round() as usize;
            println!(
                "   {:<14} {:<width$} {:>5.1}%  {}",
                truncate(&slice.category, 14),
                "█".repeat(filled.min(BAR_WIDTH)),
                slice.percentage,
                format_brl(slice.amount),
                width = BAR_WIDTH
            );
        }
    }

    println!();
    println!("  📈 Daily flow");
    for day in &dashboard.daily_flow {
        println!("   {} │ {:>14}", day.date, format_brl(day.net));
    }

    println!();
    if dashboard.selected_categories.is_empty() {
        println!("  📝 Transactions");
    } else {
        println!(
            "  📝 Transactions ({})",
            dashboard.selected_categories.join(", ")
        );
    }
    println!("   ─────────────────────────────────────────────────────────────");
    print_rows(&dashboard.transactions, usize::MAX);

    println!();
    println!("  Categories: {}", dashboard.categories.join(", "));

    Ok(())
}

pub async fn cmd_transactions<S: TransactionStore>(
    store: &S,
    categories: &[String],
    limit: usize,
) -> Result<()> {
    let records = fetch_for_display(store).await;
    let rows = detail_table(&records, categories);

    if rows.is_empty() {
        println!("No transactions found. Process a statement with:");
        println!("  saldo process --file extrato.pdf");
        return Ok(());
    }

    println!();
    println!("📝 Transactions");
    println!("   ─────────────────────────────────────────────────────────────");
    print_rows(&rows, limit);

    Ok(())
}

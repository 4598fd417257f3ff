//! Dashboard aggregates
//!
//! Pure functions over the stored records. Nothing here touches a store.

use std::collections::{BTreeMap, HashMap};

use crate::models::{CategorySlice, Dashboard, DailyFlow, Summary, Transaction};

/// Income, expense and net totals
pub fn summarize(records: &[Transaction]) -> Summary {
    let income: f64 = records.iter().map(|t| t.amount).filter(|a| *a > 0.0).sum();
    let expense: f64 = records.iter().map(|t| t.amount).filter(|a| *a < 0.0).sum();
    Summary {
        income,
        expense,
        net: income + expense,
        transaction_count: records.len(),
    }
}

/// Absolute expenses per category, largest first
pub fn expenses_by_category(records: &[Transaction]) -> Vec<CategorySlice> {
    let mut totals: HashMap<&str, (f64, usize)> = HashMap::new();
    for t in records.iter().filter(|t| t.amount < 0.0) {
        let entry = totals.entry(t.category.as_str()).or_insert((0.0, 0));
        entry.0 += t.amount.abs();
        entry.1 += 1;
    }

    let grand_total: f64 = totals.values().map(|(amount, _)| amount).sum();

    let mut slices: Vec<CategorySlice> = totals
        .into_iter()
        .map(|(category, (amount, count))| CategorySlice {
            category: category.to_string(),
            amount,
            percentage: if grand_total > 0.0 {
                amount / grand_total * 100.0
            } else {
                0.0
            },
            transaction_count: count,
        })
        .collect();

    slices.sort_by(|a, b| {
        b.amount
            .total_cmp(&a.amount)
            .then_with(|| a.category.cmp(&b.category))
    });
    slices
}

/// Net amount per day, oldest first
pub fn daily_flow(records: &[Transaction]) -> Vec<DailyFlow> {
    let mut by_day = BTreeMap::new();
    for t in records {
        *by_day.entry(t.date).or_insert(0.0) += t.amount;
    }
    by_day
        .into_iter()
        .map(|(date, net)| DailyFlow { date, net })
        .collect()
}

/// Distinct categories, in first-seen order
pub fn category_options(records: &[Transaction]) -> Vec<String> {
    let mut seen = Vec::<String>::new();
    for t in records {
        if !seen.iter().any(|c| c == &t.category) {
            seen.push(t.category.clone());
        }
    }
    seen
}

/// Records whose category is selected; an empty selection keeps everything
pub fn filter_by_categories(records: &[Transaction], selected: &[String]) -> Vec<Transaction> {
    if selected.is_empty() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|t| selected.iter().any(|s| s == &t.category))
        .cloned()
        .collect()
}

/// Filtered records, newest first (ties keep stored order)
pub fn detail_table(records: &[Transaction], selected: &[String]) -> Vec<Transaction> {
    let mut rows = filter_by_categories(records, selected);
    rows.sort_by(|a, b| b.date.cmp(&a.date));
    rows
}

impl Dashboard {
    /// Compute every dashboard element from the stored records
    ///
    /// Metrics and charts cover all records; only the detail table honours
    /// the category selection.
    pub fn build(records: &[Transaction], selected: &[String]) -> Self {
        Dashboard {
            is_empty: records.is_empty(),
            summary: summarize(records),
            expenses_by_category: expenses_by_category(records),
            daily_flow: daily_flow(records),
            categories: category_options(records),
            selected_categories: selected.to_vec(),
            transactions: detail_table(records, selected),
        }
    }
}

/// Split a `A,B`-style query value into category names
pub fn parse_category_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn tx(id: i64, day: u32, category: &str, amount: f64) -> Transaction {
        Transaction {
            id,
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            description: format!("tx {}", id),
            amount,
            source: "Nubank".to_string(),
            category: category.to_string(),
            note: String::new(),
            created_at: None,
        }
    }

    fn sample() -> Vec<Transaction> {
        vec![
            tx(1, 3, "Receita", 100.0),
            tx(2, 3, "Alimentação", -40.0),
            tx(3, 5, "Transporte", -10.0),
        ]
    }

    #[test]
    fn test_summarize() {
        let summary = summarize(&sample());
        assert_eq!(summary.income, 100.0);
        assert_eq!(summary.expense, -50.0);
        assert_eq!(summary.net, 50.0);
        assert_eq!(summary.transaction_count, 3);
    }

    #[test]
    fn test_summarize_empty() {
        assert_eq!(summarize(&[]), Summary::default());
    }

    #[test]
    fn test_expenses_by_category() {
        let mut records = sample();
        records.push(tx(4, 6, "Alimentação", -10.0));

        let slices = expenses_by_category(&records);
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].category, "Alimentação");
        assert_eq!(slices[0].amount, 50.0);
        assert_eq!(slices[0].transaction_count, 2);
        assert!((slices[0].percentage - 83.333).abs() < 0.01);
        assert_eq!(slices[1].category, "Transporte");
        assert!(slices.iter().all(|s| s.category != "Receita"));
    }

    #[test]
    fn test_expenses_by_category_without_expenses() {
        assert!(expenses_by_category(&[tx(1, 1, "Receita", 5.0)]).is_empty());
    }

    #[test]
    fn test_daily_flow_sums_per_day_ascending() {
        let mut records = sample();
        records.insert(0, tx(9, 7, "Lazer", -5.0));

        let flow = daily_flow(&records);
        let days: Vec<_> = flow.iter().map(|d| d.date.to_string()).collect();
        assert_eq!(days, vec!["2024-01-03", "2024-01-05", "2024-01-07"]);
        assert_eq!(flow[0].net, 60.0);
        assert_eq!(flow[1].net, -10.0);
    }

    #[test]
    fn test_category_options_first_seen_order() {
        let mut records = sample();
        records.push(tx(4, 6, "Receita", 1.0));
        assert_eq!(
            category_options(&records),
            vec!["Receita", "Alimentação", "Transporte"]
        );
    }

    #[test]
    fn test_filter_empty_selection_is_identity() {
        let records = sample();
        assert_eq!(filter_by_categories(&records, &[]), records);
    }

    #[test]
    fn test_filter_subset_keeps_order() {
        let mut records = sample();
        records.push(tx(4, 1, "Alimentação", -1.0));
        let selected = vec!["Alimentação".to_string(), "Transporte".to_string()];

        let ids: Vec<_> = filter_by_categories(&records, &selected)
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![2, 3, 4]);
    }

    #[test]
    fn test_filter_unknown_category_is_empty() {
        assert!(filter_by_categories(&sample(), &["Casa".to_string()]).is_empty());
    }

    #[test]
    fn test_detail_table_newest_first_and_stable() {
        let ids: Vec<_> = detail_table(&sample(), &[]).iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_dashboard_build() {
        let selected = vec!["Transporte".to_string()];
        let dashboard = Dashboard::build(&sample(), &selected);
        assert!(!dashboard.is_empty);
        assert_eq!(dashboard.summary.net, 50.0);
        assert_eq!(dashboard.transactions.len(), 1);
        assert_eq!(dashboard.daily_flow.len(), 2);
        assert_eq!(dashboard.categories.len(), 3);
        assert_eq!(dashboard.selected_categories, selected);
    }

    #[test]
    fn test_dashboard_empty() {
        let dashboard = Dashboard::build(&[], &[]);
        assert!(dashboard.is_empty);
        assert!(dashboard.transactions.is_empty());
    }

    #[test]
    fn test_parse_category_list() {
        assert!(parse_category_list(None).is_empty());
        assert!(parse_category_list(Some("")).is_empty());
        assert_eq!(
            parse_category_list(Some("Lazer, Casa,,")),
            vec!["Lazer".to_string(), "Casa".to_string()]
        );
    }
}

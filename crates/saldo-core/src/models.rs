//! Domain models for Saldo

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Transaction categories the labeler may assign
///
/// The label strings are the ones shown to the model in the prompt and stored
/// verbatim, so they stay in Portuguese.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Alimentação")]
    Food,
    #[serde(rename = "Transporte")]
    Transport,
    #[serde(rename = "Lazer")]
    Leisure,
    #[serde(rename = "Fornecedores")]
    Suppliers,
    #[serde(rename = "Serviços")]
    Services,
    #[serde(rename = "Impostos")]
    Taxes,
    #[serde(rename = "Salários")]
    Salaries,
    #[serde(rename = "Receita")]
    Revenue,
    #[serde(rename = "Investimento")]
    Investment,
    #[serde(rename = "Casa")]
    Home,
    #[serde(rename = "Educação")]
    Education,
    #[serde(rename = "Saúde")]
    Health,
    /// Fallback when classification fails
    #[serde(rename = "Outros")]
    Other,
}

impl Category {
    /// The twelve labels offered to the model (fallback excluded)
    pub const LABELS: [Category; 12] = [
        Self::Food,
        Self::Transport,
        Self::Leisure,
        Self::Suppliers,
        Self::Services,
        Self::Taxes,
        Self::Salaries,
        Self::Revenue,
        Self::Investment,
        Self::Home,
        Self::Education,
        Self::Health,
    ];

    /// Label assigned when classification cannot produce a usable result
    pub const FALLBACK: Category = Category::Other;

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Food => "Alimentação",
            Self::Transport => "Transporte",
            Self::Leisure => "Lazer",
            Self::Suppliers => "Fornecedores",
            Self::Services => "Serviços",
            Self::Taxes => "Impostos",
            Self::Salaries => "Salários",
            Self::Revenue => "Receita",
            Self::Investment => "Investimento",
            Self::Home => "Casa",
            Self::Education => "Educação",
            Self::Health => "Saúde",
            Self::Other => "Outros",
        }
    }

    /// Comma-separated label list as embedded in the classification prompt
    pub fn label_list() -> String {
        Self::LABELS
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Match a free-text model reply against the label set
    ///
    /// Comparison ignores case, accents and surrounding punctuation, so
    /// "alimentacao." and "**Alimentação**" both match. Returns None for
    /// anything else, including the fallback label itself.
    pub fn from_reply(reply: &str) -> Option<Category> {
        let cleaned = reply
            .trim()
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_string();
        if cleaned.is_empty() {
            return None;
        }
        let wanted = fold(&cleaned);
        Self::LABELS
            .iter()
            .copied()
            .find(|c| fold(c.as_str()) == wanted)
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if fold(s.trim()) == fold(Self::FALLBACK.as_str()) {
            return Ok(Self::FALLBACK);
        }
        Self::from_reply(s).ok_or_else(|| format!("Unknown category: {}", s))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lowercase and strip Portuguese diacritics
fn fold(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

/// A stored transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub date: NaiveDate,
    pub description: String,
    /// Negative = expense, positive = income
    pub amount: f64,
    /// Statement issuer (e.g., "Nubank")
    pub source: String,
    /// Category label; normally one of `Category`, but lenient labeling may
    /// store whatever the model replied
    pub category: String,
    /// Provenance annotation
    pub note: String,
    /// Insertion timestamp (not every store records one)
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A transaction ready to be persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub source: String,
    pub category: String,
    pub note: String,
}

/// Income / expense / net totals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Sum of positive amounts
    pub income: f64,
    /// Sum of negative amounts (a negative number)
    pub expense: f64,
    /// income + expense
    pub net: f64,
    pub transaction_count: usize,
}

/// Share of total expenses for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySlice {
    pub category: String,
    /// Absolute value of the category's expenses
    pub amount: f64,
    /// Percentage of all expenses (0-100)
    pub percentage: f64,
    pub transaction_count: usize,
}

/// Net flow for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyFlow {
    pub date: NaiveDate,
    pub net: f64,
}

/// Everything the dashboard renders, computed from the stored records
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dashboard {
    /// True when there is no stored data (the UI shows onboarding instead)
    pub is_empty: bool,
    pub summary: Summary,
    pub expenses_by_category: Vec<CategorySlice>,
    pub daily_flow: Vec<DailyFlow>,
    /// Distinct categories present in the data (filter choices)
    pub categories: Vec<String>,
    /// Categories the detail table was filtered by (empty = all)
    pub selected_categories: Vec<String>,
    /// Detail table rows, newest first
    pub transactions: Vec<Transaction>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_list_has_twelve_entries() {
        let list = Category::label_list();
        assert_eq!(list.split(", ").count(), 12);
        assert!(list.starts_with("Alimentação, Transporte"));
        assert!(!list.contains("Outros"));
    }

    #[test]
    fn test_from_reply_exact() {
        assert_eq!(Category::from_reply("Transporte"), Some(Category::Transport));
        assert_eq!(Category::from_reply("Saúde"), Some(Category::Health));
    }

    #[test]
    fn test_from_reply_ignores_case_accents_and_punctuation() {
        assert_eq!(Category::from_reply("alimentacao."), Some(Category::Food));
        assert_eq!(Category::from_reply("**Serviços**"), Some(Category::Services));
        assert_eq!(Category::from_reply("  EDUCAÇÃO\n"), Some(Category::Education));
    }

    #[test]
    fn test_from_reply_rejects_unknown() {
        assert_eq!(Category::from_reply("Mercado"), None);
        assert_eq!(Category::from_reply(""), None);
        assert_eq!(Category::from_reply("Outros"), None);
    }

    #[test]
    fn test_from_str_accepts_fallback() {
        assert_eq!("Outros".parse::<Category>(), Ok(Category::Other));
        assert_eq!("casa".parse::<Category>(), Ok(Category::Home));
        assert!("nope".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_serde_uses_labels() {
        let json = serde_json::to_string(&Category::Salaries).unwrap();
        assert_eq!(json, "\"Salários\"");
        let back: Category = serde_json::from_str("\"Impostos\"").unwrap();
        assert_eq!(back, Category::Taxes);
    }
}

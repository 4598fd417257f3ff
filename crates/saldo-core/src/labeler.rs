//! Category labeling through a text-generation backend
//!
//! One remote call per transaction. Rate-limit errors are retried with a fixed
//! backoff up to `RetryPolicy::max_attempts`; any other error, or running out
//! of attempts, yields the fallback label. Labeling never fails.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ai::TextGenerator;
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::models::Category;
use crate::prompts::{default_prompts_dir, Prompt, PromptId};

/// Bounded retry for rate-limited calls
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total calls allowed, including the first
    pub max_attempts: u32,
    /// Sleep between a rate-limited call and the next attempt
    pub backoff: Duration,
    /// Substrings of an error message that mark it as a rate limit
    pub rate_limit_markers: Vec<String>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(10),
            rate_limit_markers: vec!["429".into(), "RESOURCE_EXHAUSTED".into()],
        }
    }
}

impl RetryPolicy {
    /// Same policy with no sleeping, for tests and dry runs
    pub fn immediate(self) -> Self {
        Self {
            backoff: Duration::ZERO,
            ..self
        }
    }

    pub fn is_rate_limited(&self, err: &Error) -> bool {
        let message = err.to_string();
        self.rate_limit_markers
            .iter()
            .any(|m| message.contains(m.as_str()))
    }
}

/// What to do with a reply that is not one of the known labels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelPolicy {
    /// Map to a known label or use the fallback
    #[default]
    Strict,
    /// Store the reply as given
    Lenient,
}

impl std::str::FromStr for LabelPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            other => Err(format!("Unknown label policy: {}", other)),
        }
    }
}

/// Assigns a category label to a transaction
pub struct CategoryLabeler<G> {
    generator: G,
    retry: RetryPolicy,
    policy: LabelPolicy,
    prompt: Prompt,
}

impl<G: TextGenerator> CategoryLabeler<G> {
    /// Create a labeler using the embedded prompt
    pub fn new(generator: G, retry: RetryPolicy, policy: LabelPolicy) -> Result<Self> {
        let prompt = Prompt::embedded(PromptId::ClassifyTransaction)?;
        Ok(Self::with_prompt(generator, retry, policy, prompt))
    }

    /// Create a labeler from resolved settings, honouring a prompt override file
    pub fn from_settings(generator: G, settings: &Settings) -> Result<Self> {
        let prompt = Prompt::load(PromptId::ClassifyTransaction, default_prompts_dir().as_ref())?;
        Ok(Self::with_prompt(
            generator,
            settings.retry.clone(),
            settings.label_policy,
            prompt,
        ))
    }

    pub fn with_prompt(generator: G, retry: RetryPolicy, policy: LabelPolicy, prompt: Prompt) -> Self {
        Self {
            generator,
            retry,
            policy,
            prompt,
        }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Build the classification prompt for one transaction
    pub fn render_prompt(&self, description: &str, amount: f64) -> String {
        let amount = amount.to_string();
        let categories = Category::label_list();
        let mut vars = HashMap::new();
        vars.insert("description", description);
        vars.insert("amount", amount.as_str());
        vars.insert("categories", categories.as_str());
        self.prompt.render_user(&vars)
    }

    /// Label a transaction; always returns a label
    pub async fn label(&self, description: &str, amount: f64) -> String {
        let prompt = self.render_prompt(description, amount);
        let attempts = self.retry.max_attempts.max(1);

        for attempt in 1..=attempts {
            match self.generator.generate(&prompt).await {
                Ok(reply) => return self.interpret(description, &reply),
                Err(e) if self.retry.is_rate_limited(&e) => {
                    warn!(
                        description,
                        attempt,
                        max_attempts = attempts,
                        "Model rate limited"
                    );
                    if attempt < attempts && !self.retry.backoff.is_zero() {
                        tokio::time::sleep(self.retry.backoff).await;
                    }
                }
                Err(e) => {
                    warn!(description, error = %e, "Classification failed, using fallback");
                    return Category::FALLBACK.as_str().to_string();
                }
            }
        }

        warn!(description, "Rate limit persisted, using fallback");
        Category::FALLBACK.as_str().to_string()
    }

    fn interpret(&self, description: &str, reply: &str) -> String {
        let first_line = reply
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("");

        match self.policy {
            LabelPolicy::Lenient => {
                if first_line.is_empty() {
                    Category::FALLBACK.as_str().to_string()
                } else {
                    first_line.to_string()
                }
            }
            LabelPolicy::Strict => match Category::from_reply(first_line) {
                Some(category) => {
                    debug!(description, category = %category, "Classified");
                    category.as_str().to_string()
                }
                None => {
                    warn!(description, reply = first_line, "Reply is not a known category");
                    Category::FALLBACK.as_str().to_string()
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{MockBackend, MockReply};

    fn labeler(mock: MockBackend, policy: LabelPolicy) -> CategoryLabeler<MockBackend> {
        CategoryLabeler::new(mock, RetryPolicy::default().immediate(), policy).unwrap()
    }

    #[tokio::test]
    async fn test_rate_limited_twice_then_success() {
        let mock = MockBackend::scripted([
            MockReply::RateLimited,
            MockReply::RateLimited,
            MockReply::Text("Transporte".into()),
        ]);
        let labeler = labeler(mock.clone(), LabelPolicy::Strict);

        assert_eq!(labeler.label("Uber *Trip", -23.9).await, "Transporte");
        assert_eq!(mock.calls(), 3);
    }

    #[tokio::test]
    async fn test_other_error_falls_back_after_one_attempt() {
        let mock = MockBackend::always(MockReply::Failure("internal".into()));
        let labeler = labeler(mock.clone(), LabelPolicy::Strict);

        assert_eq!(labeler.label("Uber *Trip", -23.9).await, "Outros");
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_persistent_rate_limit_falls_back_after_max_attempts() {
        let mock = MockBackend::always(MockReply::RateLimited);
        let labeler = labeler(mock.clone(), LabelPolicy::Strict);

        assert_eq!(labeler.label("Uber *Trip", -23.9).await, "Outros");
        assert_eq!(mock.calls(), 3);
    }

    #[tokio::test]
    async fn test_marker_in_message_counts_as_rate_limit() {
        let mock = MockBackend::scripted([
            MockReply::Failure("quota RESOURCE_EXHAUSTED for project".into()),
            MockReply::Text("Lazer".into()),
        ]);
        let labeler = labeler(mock.clone(), LabelPolicy::Strict);

        assert_eq!(labeler.label("Netflix", -39.9).await, "Lazer");
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn test_custom_attempt_count() {
        let mock = MockBackend::always(MockReply::RateLimited);
        let retry = RetryPolicy {
            max_attempts: 5,
            ..RetryPolicy::default().immediate()
        };
        let labeler = CategoryLabeler::new(mock.clone(), retry, LabelPolicy::Strict).unwrap();

        labeler.label("x", 1.0).await;
        assert_eq!(mock.calls(), 5);
    }

    #[tokio::test]
    async fn test_strict_normalizes_reply() {
        let mock = MockBackend::scripted([MockReply::Text("  alimentacao.\n\nExplicação...".into())]);
        let labeler = labeler(mock, LabelPolicy::Strict);
        assert_eq!(labeler.label("Padaria", -10.0).await, "Alimentação");
    }

    #[tokio::test]
    async fn test_strict_rejects_unknown_label() {
        let mock = MockBackend::scripted([MockReply::Text("Supermercado".into())]);
        let labeler = labeler(mock, LabelPolicy::Strict);
        assert_eq!(labeler.label("Padaria", -10.0).await, "Outros");
    }

    #[tokio::test]
    async fn test_lenient_keeps_reply() {
        let mock = MockBackend::scripted([MockReply::Text(" Supermercado \n".into())]);
        let labeler = labeler(mock, LabelPolicy::Lenient);
        assert_eq!(labeler.label("Padaria", -10.0).await, "Supermercado");
    }

    #[tokio::test]
    async fn test_empty_reply_falls_back() {
        let mock = MockBackend::scripted([MockReply::Text("\n  \n".into())]);
        let labeler = labeler(mock, LabelPolicy::Lenient);
        assert_eq!(labeler.label("Padaria", -10.0).await, "Outros");
    }

    #[tokio::test]
    async fn test_identical_descriptions_are_not_cached() {
        let mock = MockBackend::new();
        let labeler = labeler(mock.clone(), LabelPolicy::Strict);
        labeler.label("Uber", -10.0).await;
        labeler.label("Uber", -10.0).await;
        assert_eq!(mock.calls(), 2);
    }

    #[test]
    fn test_prompt_embeds_transaction_and_labels() {
        let labeler = labeler(MockBackend::new(), LabelPolicy::Strict);
        let prompt = labeler.render_prompt("Compra Supermercado", -1234.56);
        assert!(prompt.contains("Transação: Compra Supermercado"));
        assert!(prompt.contains("R$ -1234.56"));
        assert!(prompt.contains("Saúde"));
        assert!(prompt.contains("APENAS a categoria"));
    }

    #[test]
    fn test_is_rate_limited() {
        let retry = RetryPolicy::default();
        assert!(retry.is_rate_limited(&Error::Api {
            status: 429,
            body: String::new()
        }));
        assert!(!retry.is_rate_limited(&Error::Api {
            status: 500,
            body: "oops".into()
        }));
    }

    #[test]
    fn test_label_policy_from_str() {
        assert_eq!("Strict".parse::<LabelPolicy>(), Ok(LabelPolicy::Strict));
        assert_eq!("lenient".parse::<LabelPolicy>(), Ok(LabelPolicy::Lenient));
        assert!("loose".parse::<LabelPolicy>().is_err());
    }
}

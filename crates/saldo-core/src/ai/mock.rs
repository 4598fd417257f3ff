//! Mock backend for testing
//!
//! Replies can be scripted per call; once the script runs out the backend
//! guesses a label from keywords in the prompt. Every call is counted so
//! tests can assert on retry behaviour.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{Error, Result};

use super::TextGenerator;

/// One scripted reply
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Successful text reply
    Text(String),
    /// HTTP 429 with a RESOURCE_EXHAUSTED body
    RateLimited,
    /// Any other failure (HTTP 500)
    Failure(String),
}

impl MockReply {
    fn into_result(self) -> Result<String> {
        match self {
            MockReply::Text(text) => Ok(text),
            MockReply::RateLimited => Err(Error::Api {
                status: 429,
                body: r#"{"error":{"code":429,"status":"RESOURCE_EXHAUSTED"}}"#.to_string(),
            }),
            MockReply::Failure(message) => Err(Error::Api {
                status: 500,
                body: message,
            }),
        }
    }
}

/// Mock text-generation backend
#[derive(Clone)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    model: String,
    script: Arc<Mutex<VecDeque<MockReply>>>,
    /// Reply used for every call after the script is exhausted
    repeat: Option<MockReply>,
    calls: Arc<AtomicUsize>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a new mock backend (healthy, keyword replies)
    pub fn new() -> Self {
        Self {
            healthy: true,
            model: "mock".to_string(),
            script: Arc::new(Mutex::new(VecDeque::new())),
            repeat: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new()
        }
    }

    /// Reply with each scripted response in turn
    pub fn scripted(replies: impl IntoIterator<Item = MockReply>) -> Self {
        let backend = Self::new();
        if let Ok(mut script) = backend.script.lock() {
            script.extend(replies);
        }
        backend
    }

    /// Reply with the same response forever
    pub fn always(reply: MockReply) -> Self {
        Self {
            repeat: Some(reply),
            ..Self::new()
        }
    }

    /// Create a new instance with a different model name (shares the script)
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..self.clone()
        }
    }

    /// Number of `generate` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Keyword guess used when no scripted reply is queued
    pub fn guess_label(prompt: &str) -> &'static str {
        let description = prompt
            .lines()
            .find_map(|l| l.trim().strip_prefix("Transação:"))
            .unwrap_or(prompt)
            .to_lowercase();

        let rules: &[(&[&str], &str)] = &[
            (&["uber", "99app", "posto", "combustível"], "Transporte"),
            (&["mercado", "padaria", "ifood", "restaurante", "feira"], "Alimentação"),
            (&["farmácia", "drogaria", "hospital"], "Saúde"),
            (&["netflix", "spotify", "cinema"], "Lazer"),
            (&["aluguel", "condomínio", "luz", "energia"], "Casa"),
            (&["escola", "curso", "faculdade"], "Educação"),
            (&["darf", "imposto", "iptu", "ipva"], "Impostos"),
            (&["salário", "folha"], "Salários"),
            (&["resgate", "cdb", "rdb", "tesouro"], "Investimento"),
            (&["recebid", "depósito"], "Receita"),
        ];

        rules
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| description.contains(k)))
            .map(|(_, label)| *label)
            .unwrap_or("Serviços")
    }
}

#[async_trait]
impl TextGenerator for MockBackend {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let scripted = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();

        match scripted.or_else(|| self.repeat.clone()) {
            Some(reply) => reply.into_result(),
            None => Ok(Self::guess_label(prompt).to_string()),
        }
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_guess_from_prompt() {
        let mock = MockBackend::new();
        let prompt = "Categorize.\nTransação: Compra Padaria Real\nValor: R$ -12.5";
        assert_eq!(mock.generate(prompt).await.unwrap(), "Alimentação");
        assert_eq!(mock.generate("Transação: xyz").await.unwrap(), "Serviços");
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn test_script_then_guess() {
        let mock = MockBackend::scripted([MockReply::RateLimited, MockReply::Text("Casa".into())]);

        let err = mock.generate("Transação: Uber").await.unwrap_err();
        assert!(err.to_string().contains("429"));
        assert_eq!(mock.generate("Transação: Uber").await.unwrap(), "Casa");
        assert_eq!(mock.generate("Transação: Uber").await.unwrap(), "Transporte");
        assert_eq!(mock.calls(), 3);
    }

    #[tokio::test]
    async fn test_always() {
        let mock = MockBackend::always(MockReply::Failure("boom".into()));
        for _ in 0..3 {
            assert!(mock.generate("x").await.is_err());
        }
        assert_eq!(mock.calls(), 3);
    }

    #[tokio::test]
    async fn test_clones_share_call_count() {
        let mock = MockBackend::new();
        let other = mock.with_model("other");
        other.generate("x").await.unwrap();
        assert_eq!(mock.calls(), 1);
        assert_eq!(other.model(), "other");
    }

    #[tokio::test]
    async fn test_health() {
        assert!(MockBackend::new().health_check().await);
        assert!(!MockBackend::unhealthy().health_check().await);
    }
}

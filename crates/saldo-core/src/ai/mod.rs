//! Pluggable text-generation backend abstraction
//!
//! The labeler only needs "send a prompt, get text back", so the interface is
//! a single `generate` call plus a health probe.
//!
//! # Architecture
//!
//! - `TextGenerator` trait: the interface every backend implements
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `GeminiBackend`, `OpenAICompatibleBackend`, `MockBackend`
//!
//! # Usage
//!
//! ```rust,ignore
//! let settings = Settings::load(&Overrides::default(), None)?;
//! if let Some(ai) = AIClient::from_settings(&settings) {
//!     let reply = ai.generate("Categorize: Uber *Trip").await?;
//! }
//! ```
//!
//! # Errors
//!
//! Non-success HTTP responses surface as `Error::Api { status, body }` with the
//! provider's body untouched, which is what rate-limit detection matches on.

mod gemini;
mod mock;
mod openai_compatible;

pub use gemini::GeminiBackend;
pub use mock::{MockBackend, MockReply};
pub use openai_compatible::OpenAICompatibleBackend;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::error::Result;

/// Trait defining the interface for all text-generation backends
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Send a single-turn prompt and return the model's text reply
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> bool;

    /// Get the model name
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Which backend `AIClient::from_settings` builds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Gemini,
    OpenaiCompatible,
    Mock,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenaiCompatible => "openai_compatible",
            Self::Mock => "mock",
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai_compatible" | "openai" | "vllm" | "localai" | "llamacpp" => {
                Ok(Self::OpenaiCompatible)
            }
            "mock" => Ok(Self::Mock),
            other => Err(format!("Unknown AI backend: {}", other)),
        }
    }
}

/// Concrete AI client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum AIClient {
    /// Google Generative Language API
    Gemini(GeminiBackend),
    /// Any `/v1/chat/completions` server (vLLM, LocalAI, llama-server, etc.)
    OpenAICompatible(OpenAICompatibleBackend),
    /// Scripted backend for testing
    Mock(MockBackend),
}

impl AIClient {
    /// Build the configured backend
    ///
    /// Returns None when the backend needs an API key that is not configured.
    pub fn from_settings(settings: &Settings) -> Option<Self> {
        match settings.ai_backend {
            BackendKind::Gemini => {
                let Some(key) = settings.model_api_key.as_deref() else {
                    tracing::error!("No model API key configured, classification is unavailable");
                    return None;
                };
                Some(AIClient::Gemini(GeminiBackend::with_api_key(
                    &settings.model_host,
                    &settings.model,
                    key,
                )))
            }
            BackendKind::OpenaiCompatible => {
                let mut backend =
                    OpenAICompatibleBackend::new(&settings.model_host, &settings.model);
                if let Some(key) = settings.model_api_key.as_deref() {
                    backend = backend.with_api_key(key);
                }
                Some(AIClient::OpenAICompatible(backend))
            }
            BackendKind::Mock => Some(AIClient::Mock(MockBackend::new())),
        }
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        AIClient::Mock(MockBackend::new())
    }

    /// Create a new instance with a different model
    pub fn with_model(&self, model: &str) -> Self {
        match self {
            AIClient::Gemini(b) => AIClient::Gemini(b.with_model(model)),
            AIClient::OpenAICompatible(b) => AIClient::OpenAICompatible(b.with_model(model)),
            AIClient::Mock(b) => AIClient::Mock(b.with_model(model)),
        }
    }

    /// Backend name for status output
    pub fn kind(&self) -> BackendKind {
        match self {
            AIClient::Gemini(_) => BackendKind::Gemini,
            AIClient::OpenAICompatible(_) => BackendKind::OpenaiCompatible,
            AIClient::Mock(_) => BackendKind::Mock,
        }
    }
}

#[async_trait]
impl TextGenerator for AIClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        match self {
            AIClient::Gemini(b) => b.generate(prompt).await,
            AIClient::OpenAICompatible(b) => b.generate(prompt).await,
            AIClient::Mock(b) => b.generate(prompt).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::Gemini(b) => b.health_check().await,
            AIClient::OpenAICompatible(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::Gemini(b) => b.model(),
            AIClient::OpenAICompatible(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::Gemini(b) => b.host(),
            AIClient::OpenAICompatible(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }
}

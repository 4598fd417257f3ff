//! Google Gemini backend
//!
//! Talks to the Generative Language REST API:
//! `POST {host}/v1beta/models/{model}:generateContent`.
//! The API key travels in the `x-goog-api-key` header so it never shows up in
//! logged URLs.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

use super::TextGenerator;

/// Gemini backend
#[derive(Clone)]
pub struct GeminiBackend {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiBackend {
    /// Create a backend without credentials (useful against local mocks)
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: None,
        }
    }

    /// Create with an API key
    pub fn with_api_key(base_url: &str, model: &str, api_key: &str) -> Self {
        Self {
            api_key: Some(api_key.to_string()),
            ..Self::new(base_url, model)
        }
    }

    /// Create a new instance with a different model
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..self.clone()
        }
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_key {
            Some(ref key) => builder.header("x-goog-api-key", key),
            None => builder,
        }
    }
}

/// generateContent request body
#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

/// generateContent response body
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate
    fn text(self) -> Option<String> {
        let candidate = self.candidates.into_iter().next()?;
        let text: String = candidate
            .content
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiBackend {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let response = self
            .request(self.http_client.post(url).json(&request))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api { status, body });
        }

        let body: GenerateContentResponse = response.json().await?;
        let text = body
            .text()
            .ok_or_else(|| Error::InvalidData("No response from Gemini API".into()))?;
        debug!(model = %self.model, reply = %text, "Gemini reply");
        Ok(text)
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/v1beta/models/{}", self.base_url, self.model);
        match self.request(self.http_client.get(url)).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockGeminiServer;

    #[test]
    fn test_backend_new_trims_trailing_slash() {
        let backend = GeminiBackend::new("https://generativelanguage.googleapis.com/", "gemini-2.5-flash");
        assert_eq!(backend.host(), "https://generativelanguage.googleapis.com");
        assert_eq!(backend.model(), "gemini-2.5-flash");
    }

    #[test]
    fn test_request_serialization() {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some("Olá".into()),
                }],
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Olá");
    }

    #[test]
    fn test_response_text_joins_parts() {
        let json = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Alimen"}, {"text": "tação\n"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 40}
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text().as_deref(), Some("Alimentação\n"));
    }

    #[test]
    fn test_response_without_candidates() {
        let response: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        assert!(response.text().is_none());
    }

    #[tokio::test]
    async fn test_generate_against_mock_server() {
        let server = MockGeminiServer::start().await;
        let backend = GeminiBackend::with_api_key(&server.url(), "gemini-2.5-flash", "test-key");

        let reply = backend.generate("Transação: Uber *Trip").await.unwrap();
        assert_eq!(reply, "Transporte");
        assert!(backend.health_check().await);
    }

    #[tokio::test]
    async fn test_rate_limit_surfaces_status_and_body() {
        let server = MockGeminiServer::start_rate_limited(1).await;
        let backend = GeminiBackend::with_api_key(&server.url(), "gemini-2.5-flash", "test-key");

        let err = backend.generate("Transação: Uber").await.unwrap_err();
        match err {
            Error::Api { status, ref body } => {
                assert_eq!(status, 429);
                assert!(body.contains("RESOURCE_EXHAUSTED"));
            }
            other => panic!("unexpected error: {other}"),
        }

        // The next call goes through
        assert_eq!(backend.generate("Transação: Uber").await.unwrap(), "Transporte");
    }

    #[tokio::test]
    async fn test_missing_key_is_rejected() {
        let server = MockGeminiServer::start().await;
        let backend = GeminiBackend::new(&server.url(), "gemini-2.5-flash");
        let err = backend.generate("x").await.unwrap_err();
        assert!(matches!(err, Error::Api { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_health_check_unreachable() {
        let backend = GeminiBackend::new("http://localhost:99999", "gemini-2.5-flash");
        assert!(!backend.health_check().await);
    }
}

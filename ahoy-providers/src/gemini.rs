//! Gemini `generateContent` client

use ahoy_core::config::ProviderConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

use crate::base::{ChatProvider, ProviderError, ProviderResult, Role, Turn};

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Gemini API request format
#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: Role,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

/// Gemini API response format
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

/// Gemini provider client
pub struct GeminiClient {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(
        api_key: impl Into<String>,
        api_base: Option<String>,
        model: Option<String>,
        timeout: Duration,
    ) -> Self {
        let api_base = api_base
            .filter(|base| !base.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let model = model
            .filter(|model| !model.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model,
        }
    }

    /// Build a client from configuration; fails when no API key is set
    pub fn from_config(config: &ProviderConfig) -> ProviderResult<Self> {
        if !config.has_api_key() {
            return Err(ProviderError::ConfigError(
                "Gemini API key is missing".to_string(),
            ));
        }
        Ok(Self::new(
            config.api_key.trim(),
            Some(config.api_base.clone()),
            Some(config.model.clone()),
            Duration::from_secs(config.timeout_secs),
        ))
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }
}

#[async_trait]
impl ChatProvider for GeminiClient {
    async fn generate(&self, turns: Vec<Turn>) -> ProviderResult<Option<String>> {
        let request = GenerateContentRequest {
            contents: turns
                .iter()
                .map(|turn| Content {
                    role: turn.role,
                    parts: vec![Part { text: &turn.text }],
                })
                .collect(),
        };

        debug!("Calling Gemini model {} with {} turns", self.model, turns.len());
        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Gemini request failed: {} - {}", status, error_text);
            return Err(ProviderError::ApiError(format!("{}: {}", status, error_text)));
        }

        let body = response.text().await?;
        let parsed: GenerateContentResponse = serde_json::from_str(&body)?;
        Ok(parsed.first_text())
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn client_for(server: &mockito::ServerGuard) -> GeminiClient {
        GeminiClient::new(
            "test-key",
            Some(server.url()),
            None,
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_defaults() {
        let client = GeminiClient::new("k", None, Some("  ".to_string()), Duration::from_secs(1));
        assert_eq!(client.model(), "gemini-2.0-flash");
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_from_config_requires_key() {
        let config = ProviderConfig::default();
        assert!(matches!(
            GeminiClient::from_config(&config),
            Err(ProviderError::ConfigError(_))
        ));

        let config = ProviderConfig {
            api_key: "abc".to_string(),
            api_base: "https://example.test/v1/".to_string(),
            ..ProviderConfig::default()
        };
        let client = GeminiClient::from_config(&config).unwrap();
        assert_eq!(
            client.endpoint(),
            "https://example.test/v1/models/gemini-2.0-flash:generateContent"
        );
    }

    #[tokio::test]
    async fn test_generate_returns_first_text_part() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.0-flash:generateContent")
            .match_query(Matcher::UrlEncoded("key".into(), "test-key".into()))
            .match_body(Matcher::Json(json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "Talk like a pirate."}]},
                    {"role": "user", "parts": [{"text": "Hello"}]},
                    {"role": "model", "parts": [{"text": "Ahoy!"}]}
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "candidates": [
                        {"content": {"role": "model", "parts": [{"text": "Arr, matey!"}, {"text": "ignored"}]}},
                        {"content": {"role": "model", "parts": [{"text": "second"}]}}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = client_for(&server);
        let reply = client
            .generate(vec![
                Turn::user("Talk like a pirate."),
                Turn::user("Hello"),
                Turn::model("Ahoy!"),
            ])
            .await
            .unwrap();

        assert_eq!(reply.as_deref(), Some("Arr, matey!"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_without_candidates_is_none() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/models/gemini-2.0-flash:generateContent")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#)
            .create_async()
            .await;

        let reply = client_for(&server).generate(vec![Turn::user("hi")]).await.unwrap();
        assert!(reply.is_none());
    }

    #[tokio::test]
    async fn test_generate_maps_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/models/gemini-2.0-flash:generateContent")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body(r#"{"error":{"message":"API key not valid"}}"#)
            .create_async()
            .await;

        let err = client_for(&server)
            .generate(vec![Turn::user("hi")])
            .await
            .unwrap_err();
        match err {
            ProviderError::ApiError(message) => {
                assert!(message.contains("403"));
                assert!(message.contains("API key not valid"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

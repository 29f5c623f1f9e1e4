//! Base trait for upstream model providers

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for provider operations
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Conversation role in the upstream vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    /// Map a relay wire sender: `"ai"` is the model, anything else the user
    pub fn from_relay_sender(sender: &str) -> Self {
        if sender == crate::relay::ASSISTANT_WIRE_SENDER {
            Role::Model
        } else {
            Role::User
        }
    }
}

/// One turn of the conversation sent upstream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    /// Create a user turn
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    /// Create a model turn
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// Trait for upstream model providers
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Generate a reply to `turns`
    ///
    /// `Ok(None)` means the model answered without any text.
    async fn generate(&self, turns: Vec<Turn>) -> ProviderResult<Option<String>>;

    /// Model used for generation
    fn model(&self) -> &str;
}

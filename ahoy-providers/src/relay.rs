//! Client side of the relay's `POST /chat`

use ahoy_core::config::ClientConfig;
use ahoy_core::session::{Message, Sender};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Wire value of [`Sender::User`]
pub const USER_WIRE_SENDER: &str = "user";
/// Wire value of [`Sender::Assistant`]
pub const ASSISTANT_WIRE_SENDER: &str = "ai";

/// Error type for relay round-trips
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Relay returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Relay reply is not valid JSON: {0}")]
    InvalidBody(#[from] serde_json::Error),

    #[error("Relay reply has no text")]
    MissingText,

    #[error("Relay did not answer within {0:?}")]
    Timeout(Duration),
}

pub type RelayResult<T> = Result<T, RelayError>;

/// A history entry as sent to the relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayMessage {
    pub text: String,
    pub sender: String,
    pub timestamp: i64,
}

impl From<&Message> for RelayMessage {
    fn from(message: &Message) -> Self {
        let sender = match message.sender {
            Sender::User => USER_WIRE_SENDER,
            Sender::Assistant => ASSISTANT_WIRE_SENDER,
        };
        Self {
            text: message.text.clone(),
            sender: sender.to_string(),
            timestamp: message.timestamp,
        }
    }
}

/// Body of `POST /chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayRequest {
    pub messages: Vec<RelayMessage>,
}

impl RelayRequest {
    /// Build a request carrying the whole history
    pub fn from_history(history: &[Message]) -> Self {
        Self {
            messages: history.iter().map(RelayMessage::from).collect(),
        }
    }
}

/// Successful `POST /chat` reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayReply {
    #[serde(default)]
    pub text: Option<String>,
}

/// Sends a conversation history to the relay and waits for one reply
#[async_trait]
pub trait RelayClient: Send + Sync {
    async fn send(&self, history: &[Message]) -> RelayResult<String>;
}

/// reqwest-backed relay client
pub struct HttpRelayClient {
    client: Client,
    url: String,
}

impl HttpRelayClient {
    /// Create a client posting to `url` (the full `/chat` endpoint)
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            url: url.into(),
        }
    }

    /// Create a client from configuration
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            config.relay_url.trim(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Endpoint this client posts to
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RelayClient for HttpRelayClient {
    async fn send(&self, history: &[Message]) -> RelayResult<String> {
        debug!("Posting {} messages to {}", history.len(), self.url);
        let response = self
            .client
            .post(&self.url)
            .json(&RelayRequest::from_history(history))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Relay returned {}: {}", status, body);
            return Err(RelayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let reply: RelayReply = serde_json::from_str(&body)?;
        reply.text.ok_or(RelayError::MissingText)
    }
}

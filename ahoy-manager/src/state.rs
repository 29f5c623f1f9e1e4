use ahoy_core::config::ProviderConfig;
use ahoy_providers::{ChatProvider, GeminiClient, Role, Turn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct AppState {
    /// `None` when no upstream credential is configured
    pub provider: Option<Arc<dyn ChatProvider>>,
    pub system_instruction: String,
    pub fallback_text: String,
}

impl AppState {
    pub fn new(provider: Option<Arc<dyn ChatProvider>>, config: &ProviderConfig) -> Self {
        Self {
            provider,
            system_instruction: config.system_instruction.clone(),
            fallback_text: config.fallback_text.clone(),
        }
    }

    /// Build the state with a Gemini client, if a key is configured
    pub fn from_config(config: &ProviderConfig) -> Self {
        let provider = match GeminiClient::from_config(config) {
            Ok(client) => Some(Arc::new(client) as Arc<dyn ChatProvider>),
            Err(e) => {
                warn!("Relay starting without upstream provider: {}", e);
                None
            }
        };
        Self::new(provider, config)
    }

    /// Upstream turns for a relay history: the system instruction first,
    /// then every history item in order
    pub fn build_turns(&self, messages: &[Value]) -> Vec<Turn> {
        let mut turns = Vec::with_capacity(messages.len() + 1);
        turns.push(Turn::user(self.system_instruction.clone()));
        turns.extend(messages.iter().map(|item| {
            let text = item.get("text").and_then(Value::as_str).unwrap_or_default();
            let sender = item.get("sender").and_then(Value::as_str).unwrap_or_default();
            Turn {
                role: Role::from_relay_sender(sender),
                text: text.to_string(),
            }
        }));
        turns
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

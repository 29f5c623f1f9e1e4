//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration for ahoy
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Relay server configuration
    #[serde(default)]
    pub relay: RelayConfig,
    /// Upstream model provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Chat client configuration
    #[serde(default)]
    pub client: ClientConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Whether to also log to stdout
    #[serde(default = "default_true")]
    pub stdout: bool,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            stdout: true,
            overrides: HashMap::new(),
        }
    }
}

/// Relay server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Bind address
    #[serde(default = "default_relay_host")]
    pub host: String,
    /// Listen port
    #[serde(default = "default_relay_port")]
    pub port: u16,
    /// Browser origin allowed by CORS
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,
}

fn default_relay_host() -> String {
    "127.0.0.1".to_string()
}

fn default_relay_port() -> u16 {
    3001
}

fn default_allowed_origin() -> String {
    "http://localhost:5173".to_string()
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: default_relay_host(),
            port: default_relay_port(),
            allowed_origin: default_allowed_origin(),
        }
    }
}

/// Upstream generative-language API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key; empty means unconfigured
    #[serde(default)]
    pub api_key: String,
    /// API base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Model name
    #[serde(default = "default_model")]
    pub model: String,
    /// Instruction sent as the first turn of every conversation
    #[serde(default = "default_system_instruction")]
    pub system_instruction: String,
    /// Reply used when the model returns no text
    #[serde(default = "default_fallback_text")]
    pub fallback_text: String,
    /// Upstream request timeout in seconds
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

fn default_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_system_instruction() -> String {
    "You are a helpful assistant who talks like a pirate.".to_string()
}

fn default_fallback_text() -> String {
    "Arr! No response.".to_string()
}

fn default_provider_timeout() -> u64 {
    30
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: default_api_base(),
            model: default_model(),
            system_instruction: default_system_instruction(),
            fallback_text: default_fallback_text(),
            timeout_secs: default_provider_timeout(),
        }
    }
}

impl ProviderConfig {
    /// Whether an upstream credential is present
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// Chat client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Full URL of the relay chat endpoint
    #[serde(default = "default_relay_url")]
    pub relay_url: String,
    /// Relay round-trip timeout in seconds
    #[serde(default = "default_client_timeout")]
    pub timeout_secs: u64,
    /// Directory holding the session slot; defaults to the config directory
    #[serde(default)]
    pub storage_dir: Option<String>,
}

fn default_relay_url() -> String {
    "http://localhost:3001/chat".to_string()
}

fn default_client_timeout() -> u64 {
    60
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay_url: default_relay_url(),
            timeout_secs: default_client_timeout(),
            storage_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_relay_contract() {
        let config = Config::default();
        assert_eq!(config.relay.port, 3001);
        assert_eq!(config.client.relay_url, "http://localhost:3001/chat");
        assert_eq!(config.provider.model, "gemini-2.0-flash");
        assert!(!config.provider.has_api_key());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"relay":{"port":8080},"provider":{"api_key":"k"}}"#).unwrap();
        assert_eq!(config.relay.port, 8080);
        assert_eq!(config.relay.host, "127.0.0.1");
        assert!(config.provider.has_api_key());
        assert_eq!(config.provider.fallback_text, "Arr! No response.");
        assert_eq!(config.client.timeout_secs, 60);
    }
}

//! Configuration validation rules.

use super::schema::Config;

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    if config.relay.host.trim().is_empty() {
        errors.push("relay.host must not be empty".to_string());
    }
    if config.relay.port == 0 {
        errors.push("relay.port must be > 0".to_string());
    }

    if config.provider.api_base.trim().is_empty() {
        errors.push("provider.api_base must not be empty".to_string());
    }
    if config.provider.model.trim().is_empty() {
        errors.push("provider.model must not be empty".to_string());
    }
    if config.provider.timeout_secs == 0 {
        errors.push("provider.timeout_secs must be > 0".to_string());
    }

    let relay_url = config.client.relay_url.trim();
    if !(relay_url.starts_with("http://") || relay_url.starts_with("https://")) {
        errors.push("client.relay_url must be an http(s) URL".to_string());
    }
    if config.client.timeout_secs == 0 {
        errors.push("client.timeout_secs must be > 0".to_string());
    }

    if !matches!(config.logging.format.to_lowercase().as_str(), "text" | "json") {
        errors.push("logging.format must be either text or json".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_defaults() {
        validate_config(&Config::default()).unwrap();
    }

    #[test]
    fn test_validate_rejects_non_http_relay_url() {
        let mut config = Config::default();
        config.client.relay_url = "localhost:3001/chat".to_string();

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("client.relay_url"));
    }

    #[test]
    fn test_validate_aggregates_errors() {
        let mut config = Config::default();
        config.relay.port = 0;
        config.client.timeout_secs = 0;
        config.logging.format = "yaml".to_string();

        let message = validate_config(&config).unwrap_err().to_string();
        assert!(message.contains("relay.port"));
        assert!(message.contains("client.timeout_secs"));
        assert!(message.contains("logging.format"));
    }
}

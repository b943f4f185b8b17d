//! Configuration validation rules.

use super::schema::Config;

/// Validate configuration and return aggregated validation errors.
///
/// A missing API key is accepted here: the gateway still serves `/health`
/// and the chat page, and `/chat` reports the missing credential per request.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    if config.provider.model.trim().is_empty() {
        errors.push("provider.model must not be empty".to_string());
    }
    if let Some(temperature) = config.provider.temperature {
        if !(0.0..=2.0).contains(&temperature) {
            errors.push("provider.temperature must be in [0.0, 2.0]".to_string());
        }
    }
    if config.provider.max_output_tokens == Some(0) {
        errors.push("provider.max_output_tokens must be > 0".to_string());
    }
    if let Some(base) = &config.provider.api_base {
        if !base.trim().is_empty() && !base.starts_with("http://") && !base.starts_with("https://")
        {
            errors.push("provider.api_base must be an http(s) URL".to_string());
        }
    }

    if config.gateway.host.trim().is_empty() {
        errors.push("gateway.host must not be empty".to_string());
    }

    if config.session.max_history == 0 {
        errors.push("session.max_history must be > 0".to_string());
    }

    let format = config.logging.format.to_lowercase();
    if format != "text" && format != "json" {
        errors.push("logging.format must be either \"text\" or \"json\"".to_string());
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
    fn test_validate_accepts_defaults_without_key() {
        let config = Config::default();
        validate_config(&config).unwrap();
    }

    #[test]
    fn test_validate_rejects_zero_history() {
        let mut config = Config::default();
        config.session.max_history = 0;

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("session.max_history"));
    }

    #[test]
    fn test_validate_aggregates_errors() {
        let mut config = Config::default();
        config.provider.model = " ".to_string();
        config.provider.temperature = Some(3.0);
        config.logging.format = "xml".to_string();

        let msg = validate_config(&config).unwrap_err().to_string();
        assert!(msg.contains("provider.model"));
        assert!(msg.contains("provider.temperature"));
        assert!(msg.contains("logging.format"));
    }

    #[test]
    fn test_validate_rejects_non_http_base() {
        let mut config = Config::default();
        config.provider.api_base = Some("ftp://example.com".to_string());

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("provider.api_base"));
    }
}

//! Error types for the concierge gateway

use thiserror::Error;

/// The main error type for concierge operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors, including a missing provider credential
    #[error("{0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Provider (LLM) errors, carrying the provider's detail verbatim
    #[error("{0}")]
    Provider(String),

    /// Request validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

/// A specialized Result type for concierge operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_and_provider_display_verbatim() {
        let err = Error::Config("Gemini API key not configured".to_string());
        assert_eq!(err.to_string(), "Gemini API key not configured");

        let err = Error::Provider("HTTP 429: quota exceeded".to_string());
        assert_eq!(err.to_string(), "HTTP 429: quota exceeded");
    }

    #[test]
    fn test_from_serde_json() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: Error = parse_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}

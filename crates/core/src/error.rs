//! Error types for the speech server

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for synthesis
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Empty text, non-positive speed, malformed request
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Voice key not present in the registry
    #[error("Unknown voice: {voice}. Available: {available:?}")]
    UnknownVoice {
        voice: String,
        available: Vec<String>,
    },

    /// No encoder for the requested container
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Opaque failure surfaced from a model
    #[error("Inference failure: {0}")]
    InferenceFailure(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Resampling error: {0}")]
    Resample(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Errors caused by the caller's input rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidArgument(_) | Error::UnknownVoice { .. })
    }

    /// Short label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidArgument(_) => "invalid_argument",
            Error::UnknownVoice { .. } => "unknown_voice",
            Error::UnsupportedFormat(_) => "unsupported_format",
            Error::InferenceFailure(_) => "inference",
            Error::Encoding(_) => "encoding",
            Error::Resample(_) => "resample",
            Error::Config(_) => "config",
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    pub fn inference(message: impl Into<String>) -> Self {
        Error::InferenceFailure(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_voice_message_lists_available() {
        let err = Error::UnknownVoice {
            voice: "nope".to_string(),
            available: vec!["en-us".to_string(), "zh".to_string()],
        };
        let message = err.to_string();
        assert!(message.contains("nope"));
        assert!(message.contains("en-us"));
        assert!(message.contains("zh"));
    }

    #[test]
    fn test_client_error_classification() {
        assert!(Error::invalid_argument("text is required").is_client_error());
        assert!(Error::UnknownVoice {
            voice: "x".into(),
            available: vec![]
        }
        .is_client_error());
        assert!(!Error::UnsupportedFormat("ogg".into()).is_client_error());
        assert!(!Error::inference("boom").is_client_error());
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(Error::UnsupportedFormat("ogg".into()).kind(), "unsupported_format");
        assert_eq!(Error::inference("boom").kind(), "inference");
    }
}

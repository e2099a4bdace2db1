//! Error Types

use thiserror::Error;

/// Result type alias for provider and assistant operations
pub type Result<T> = std::result::Result<T, SageError>;

#[derive(Error, Debug)]
pub enum SageError {
    /// The provider answered with an error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unreachable, not responding, or timed out
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Context length exceeded
    #[error("Context length exceeded: {used} tokens (max: {max})")]
    ContextOverflow { used: u32, max: u32 },

    /// Chat input rejected before it reached the provider
    #[error("Invalid chat input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl SageError {
    /// Check if error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable(_) | Self::RateLimited(_)
        )
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Provider(msg) => format!("The AI service encountered an error: {msg}"),
            Self::ProviderUnavailable(_) => "The AI service is currently unavailable. Please try again.".into(),
            Self::ContextOverflow { .. } => "The conversation is too long. Please start a new chat.".into(),
            Self::InvalidInput(msg) => msg.clone(),
            Self::RateLimited(_) => "You've made too many requests. Please wait a moment.".into(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for SageError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(SageError::ProviderUnavailable("down".into()).is_retryable());
        assert!(SageError::RateLimited("slow down".into()).is_retryable());
        assert!(!SageError::Provider("bad model".into()).is_retryable());
        assert!(!SageError::InvalidInput("empty".into()).is_retryable());
    }

    #[test]
    fn test_user_message_hides_internals() {
        let err = SageError::ProviderUnavailable("connection refused on 127.0.0.1:11434".into());
        assert!(!err.user_message().contains("11434"));
    }
}

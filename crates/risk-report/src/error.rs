//! Error Types for the Risk Report Pipeline
//!
//! Soft failures (market data) are absorbed by the enricher; hard failures
//! (scoring) travel up to the report surface and end the run.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReportError>;

/// Which external call produced a response
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Upstream {
    MarketData,
    RiskScoring,
}

impl std::fmt::Display for Upstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MarketData => write!(f, "market data"),
            Self::RiskScoring => write!(f, "risk scoring"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Wallet is not connected")]
    NotConnected,

    #[error("Market data unavailable: {0}")]
    EnrichmentUnavailable(String),

    #[error("Risk scoring unavailable: {0}")]
    ScoringUnavailable(String),

    #[error("Malformed {upstream} response: {detail}")]
    MalformedUpstreamResponse {
        upstream: Upstream,
        detail: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReportError {
    pub fn malformed(upstream: Upstream, detail: impl Into<String>) -> Self {
        Self::MalformedUpstreamResponse {
            upstream,
            detail: detail.into(),
        }
    }

    /// True when the failure ends the run (scoring side)
    pub const fn is_hard_failure(&self) -> bool {
        matches!(
            self,
            Self::ScoringUnavailable(_)
                | Self::MalformedUpstreamResponse {
                    upstream: Upstream::RiskScoring,
                    ..
                }
        )
    }

    /// Check if a manual re-run may succeed
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::EnrichmentUnavailable(_)
                | Self::ScoringUnavailable(_)
                | Self::MalformedUpstreamResponse { .. }
                | Self::Network(_)
        )
    }

    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::NotConnected => "Please connect your wallet first.",
            Self::EnrichmentUnavailable(_)
            | Self::MalformedUpstreamResponse {
                upstream: Upstream::MarketData,
                ..
            } => "Live prices are unavailable right now. Your report was generated without them.",
            Self::ScoringUnavailable(_)
            | Self::MalformedUpstreamResponse {
                upstream: Upstream::RiskScoring,
                ..
            } => "Failed to generate AI report. Please try again.",
            Self::Config(_) => "Service configuration error.",
            _ => "An unexpected error occurred.",
        }
    }
}

impl From<sage_core::SageError> for ReportError {
    fn from(err: sage_core::SageError) -> Self {
        match err {
            sage_core::SageError::Json(e) => Self::malformed(Upstream::RiskScoring, e.to_string()),
            other => Self::ScoringUnavailable(other.to_string()),
        }
    }
}

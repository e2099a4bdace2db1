//! Risk Scoring Client
//!
//! Delegates holdings to an external AI scoring capability. Implementations
//! must never invent scores: anything they cannot get from the backend is an
//! error for the whole run.

mod llm;
mod mock;

pub use llm::LlmRiskScorer;
pub use mock::MockRiskScorer;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result, Upstream};
use crate::model::{Holding, TokenAnalysis};

/// `analyzeTokens(holdings) -> TokenAnalysis[]`
#[async_trait]
pub trait RiskScorer: Send + Sync {
    /// Score a non-empty set of holdings. One attempt, no retry.
    async fn score(&self, holdings: &[Holding]) -> Result<Vec<TokenAnalysis>>;

    fn name(&self) -> &str;

    /// Rating scale the scores are reported on
    fn scale(&self) -> ScoreScale {
        ScoreScale::default()
    }
}

/// Bounds of the scoring backend's rating scale
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreScale {
    pub min: f64,
    pub max: f64,
}

impl Default for ScoreScale {
    fn default() -> Self {
        Self { min: 0.0, max: 10.0 }
    }
}

impl ScoreScale {
    pub fn contains(&self, score: f64) -> bool {
        score.is_finite() && score >= self.min && score <= self.max
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

/// Validate a backend reply against the holdings that were sent.
///
/// Output is in holdings order with canonical symbols. Entries for tokens
/// that were not sent are dropped; a held token without an entry, or any
/// score outside `scale`, makes the whole reply malformed.
pub fn normalize_analyses(
    holdings: &[Holding],
    analyses: Vec<TokenAnalysis>,
    scale: ScoreScale,
) -> Result<Vec<TokenAnalysis>> {
    let mut remaining = analyses;
    let mut normalized = Vec::with_capacity(holdings.len());

    for holding in holdings {
        let pos = remaining
            .iter()
            .position(|a| a.symbol.trim().eq_ignore_ascii_case(&holding.symbol))
            .ok_or_else(|| {
                ReportError::malformed(
                    Upstream::RiskScoring,
                    format!("no analysis returned for {}", holding.symbol),
                )
            })?;

        let mut analysis = remaining.swap_remove(pos);
        if !scale.contains(analysis.risk_score) {
            return Err(ReportError::malformed(
                Upstream::RiskScoring,
                format!(
                    "score {} for {} is outside [{}, {}]",
                    analysis.risk_score, holding.symbol, scale.min, scale.max
                ),
            ));
        }
        analysis.symbol.clone_from(&holding.symbol);
        if analysis.name.trim().is_empty() {
            analysis.name.clone_from(&holding.name);
        }
        if analysis.suggestions.as_deref().is_some_and(|s| s.trim().is_empty()) {
            analysis.suggestions = None;
        }
        normalized.push(analysis);
    }

    if !remaining.is_empty() {
        tracing::debug!(extra = remaining.len(), "Dropping analyses for tokens not held");
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn holdings() -> Vec<Holding> {
        vec![
            Holding::new("Ethereum", "ETH", dec!(1)),
            Holding::new("Bitcoin", "BTC", dec!(0.1)),
        ]
    }

    #[test]
    fn test_normalize_reorders_and_fills_names() {
        let analyses = vec![
            TokenAnalysis::new("", "btc", 8.0, "Volatile"),
            TokenAnalysis::new("Ether", "eth", 2.0, "Blue chip"),
            TokenAnalysis::new("Dogecoin", "DOGE", 9.0, "Not held"),
        ];

        let normalized = normalize_analyses(&holdings(), analyses, ScoreScale::default()).unwrap();

        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized[0].symbol, "ETH");
        assert_eq!(normalized[0].name, "Ether");
        assert_eq!(normalized[1].symbol, "BTC");
        assert_eq!(normalized[1].name, "Bitcoin");
    }

    #[test]
    fn test_missing_holding_is_malformed() {
        let analyses = vec![TokenAnalysis::new("Ethereum", "ETH", 2.0, "ok")];
        let err = normalize_analyses(&holdings(), analyses, ScoreScale::default()).unwrap_err();
        assert!(err.is_hard_failure());
    }

    #[test]
    fn test_out_of_scale_is_malformed() {
        for score in [-0.5, 10.5, f64::NAN, f64::INFINITY] {
            let analyses = vec![
                TokenAnalysis::new("Ethereum", "ETH", score, "?"),
                TokenAnalysis::new("Bitcoin", "BTC", 5.0, "?"),
            ];
            assert!(normalize_analyses(&holdings(), analyses, ScoreScale::default()).is_err());
        }
    }

    #[test]
    fn test_out_of_scale_extra_is_dropped() {
        let analyses = vec![
            TokenAnalysis::new("Ethereum", "ETH", 2.0, "ok"),
            TokenAnalysis::new("Bitcoin", "BTC", 5.0, "ok"),
            TokenAnalysis::new("Dogecoin", "DOGE", 42.0, "Not held"),
        ];

        let normalized = normalize_analyses(&holdings(), analyses, ScoreScale::default()).unwrap();

        assert_eq!(normalized.len(), 2);
        assert!(normalized.iter().all(|a| a.symbol != "DOGE"));
    }

    #[test]
    fn test_scale_bounds_inclusive() {
        let scale = ScoreScale::default();
        assert!(scale.contains(0.0));
        assert!(scale.contains(10.0));
        assert!(!scale.contains(10.000_1));
    }
}

//! Aggregator
//!
//! Pure reduction of per-token scores into one overall score and tier.

use serde::{Deserialize, Serialize};

use crate::model::{AggregateReport, RiskTier, TokenAnalysis};
use crate::scoring::ScoreScale;

pub const EMPTY_WALLET_EXPLANATION: &str = "No tokens were found in your wallet. No risk detected.";
pub const EMPTY_WALLET_SUGGESTIONS: &str = "Consider adding some assets to your wallet for future analysis.";

/// Upper bounds of the Low and Moderate bands (both inclusive)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub low_max: f64,
    pub moderate_max: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            low_max: 3.0,
            moderate_max: 6.0,
        }
    }
}

impl TierThresholds {
    /// Thresholds for an arbitrary scale: 30% and 60% of its range
    pub fn for_scale(scale: ScoreScale) -> Self {
        if scale == ScoreScale::default() {
            return Self::default();
        }
        Self {
            low_max: scale.span().mul_add(0.3, scale.min),
            moderate_max: scale.span().mul_add(0.6, scale.min),
        }
    }

    pub fn classify(&self, score: f64) -> RiskTier {
        if score <= self.low_max {
            RiskTier::Low
        } else if score <= self.moderate_max {
            RiskTier::Moderate
        } else {
            RiskTier::High
        }
    }
}

/// The "nothing to assess" entry used when the wallet holds nothing
pub fn empty_wallet_sentinel() -> TokenAnalysis {
    TokenAnalysis::new("N/A", "N/A", 1.0, EMPTY_WALLET_EXPLANATION)
        .with_suggestions(EMPTY_WALLET_SUGGESTIONS)
}

/// Aggregate with the default [0, 10] thresholds
pub fn aggregate(per_token: Vec<TokenAnalysis>) -> AggregateReport {
    aggregate_with(per_token, TierThresholds::default())
}

#[allow(clippy::cast_precision_loss)]
pub fn aggregate_with(per_token: Vec<TokenAnalysis>, thresholds: TierThresholds) -> AggregateReport {
    let (per_token, empty_wallet) = if per_token.is_empty() {
        (vec![empty_wallet_sentinel()], true)
    } else {
        (per_token, false)
    };

    let overall_score = per_token.iter().map(|t| t.risk_score).sum::<f64>() / per_token.len() as f64;
    let overall_tier = thresholds.classify(overall_score);

    AggregateReport::from_parts(per_token, overall_score, overall_tier, empty_wallet)
}

//! Mock Risk Scorer
//!
//! Static per-symbol scores for demos and tests. Can be switched into failure
//! mode to exercise the `ScoringFailed` path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{RiskScorer, ScoreScale};
use crate::error::{ReportError, Result};
use crate::model::{Holding, TokenAnalysis};

pub struct MockRiskScorer {
    overrides: HashMap<String, f64>,
    scale: ScoreScale,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl Default for MockRiskScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRiskScorer {
    pub fn new() -> Self {
        Self {
            overrides: HashMap::new(),
            scale: ScoreScale::default(),
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        let scorer = Self::new();
        scorer.set_failing(true);
        scorer
    }

    /// Pin the score returned for `symbol`
    #[must_use]
    pub fn with_score(mut self, symbol: &str, score: f64) -> Self {
        self.overrides.insert(symbol.to_uppercase(), score);
        self
    }

    /// Report on `scale`; built-in scores are rescaled from 0..10
    #[must_use]
    pub const fn with_scale(mut self, scale: ScoreScale) -> Self {
        self.scale = scale;
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// (score, explanation, suggestions)
    fn base_analysis(symbol: &str) -> (f64, &'static str, &'static str) {
        match symbol {
            "BTC" => (2.0, "Largest market cap and deepest liquidity of any crypto asset.", "Suitable as a core holding."),
            "ETH" => (3.0, "Blue-chip smart contract platform with broad adoption.", "Keep position sizing in line with your risk tolerance."),
            "SOL" | "ADA" | "DOT" | "AVAX" => (5.0, "Large-cap layer 1 with higher volatility than BTC or ETH.", "Consider limiting exposure to a minority of the portfolio."),
            "LINK" | "UNI" | "MATIC" | "ATOM" | "NEAR" => (6.0, "Mid-cap token with meaningful drawdown history.", "Diversify across several assets."),
            _ => (8.0, "Smaller or less established asset with limited liquidity.", "Only allocate what you can afford to lose."),
        }
    }
}

#[async_trait]
impl RiskScorer for MockRiskScorer {
    async fn score(&self, holdings: &[Holding]) -> Result<Vec<TokenAnalysis>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.failing.load(Ordering::SeqCst) {
            return Err(ReportError::ScoringUnavailable("mock scorer is down".into()));
        }

        Ok(holdings
            .iter()
            .map(|h| {
                let (base, explanation, suggestions) = Self::base_analysis(&h.symbol);
                let score = self.overrides.get(&h.symbol).copied().unwrap_or_else(|| {
                    if self.scale == ScoreScale::default() {
                        base
                    } else {
                        (base / 10.0).mul_add(self.scale.span(), self.scale.min)
                    }
                });
                TokenAnalysis::new(&h.name, &h.symbol, score, explanation).with_suggestions(suggestions)
            })
            .collect())
    }

    fn name(&self) -> &str {
        "MockScorer"
    }

    fn scale(&self) -> ScoreScale {
        self.scale
    }
}

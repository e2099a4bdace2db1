//! Report Views
//!
//! Committed report snapshot plus the derived views a client renders: chart
//! bars, tier badge, headline and the plain-text export.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::aggregate::TierThresholds;
use crate::model::{AggregateReport, EnrichedHolding, RiskTier};
use crate::scoring::ScoreScale;
use crate::surface::RunId;

pub const DISCLAIMER: &str = "This report is for educational purposes only and is not financial advice.";

/// Fill and text colours for a tier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierColors {
    pub fill: &'static str,
    pub text: &'static str,
}

impl RiskTier {
    pub const fn colors(self) -> TierColors {
        match self {
            Self::Low => TierColors { fill: "#68D391", text: "#276749" },
            Self::Moderate => TierColors { fill: "#F6E05E", text: "#975A16" },
            Self::High => TierColors { fill: "#F56565", text: "#9B2C2C" },
        }
    }
}

/// One bar of the per-token risk chart
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartBar {
    pub label: String,
    pub risk_score: f64,
    pub tier: RiskTier,
    pub fill: &'static str,
}

/// Overall score badge
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub label: String,
    pub score: String,
    pub colors: TierColors,
}

/// Report committed by one successful run
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSnapshot {
    pub run_id: RunId,
    pub report_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub holdings: Vec<EnrichedHolding>,
    pub report: AggregateReport,
    /// Scale the scores were given on
    pub scale: ScoreScale,
    /// Bands used for the overall tier and every chart bar
    pub thresholds: TierThresholds,
}

impl ReportSnapshot {
    pub fn new(run_id: RunId, holdings: Vec<EnrichedHolding>, report: AggregateReport) -> Self {
        Self {
            run_id,
            report_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            holdings,
            report,
            scale: ScoreScale::default(),
            thresholds: TierThresholds::default(),
        }
    }

    #[must_use]
    pub const fn with_grading(mut self, scale: ScoreScale, thresholds: TierThresholds) -> Self {
        self.scale = scale;
        self.thresholds = thresholds;
        self
    }

    /// Overall score to one decimal, as displayed
    pub fn score_display(&self) -> String {
        format!("{:.1}", self.report.overall_score())
    }

    pub fn headline(&self) -> String {
        format!(
            "Your portfolio has a {} overall risk score.",
            self.report.overall_tier().label().to_lowercase()
        )
    }

    pub fn badge(&self) -> Badge {
        let tier = self.report.overall_tier();
        Badge {
            label: format!("{tier} Risk"),
            score: self.score_display(),
            colors: tier.colors(),
        }
    }

    /// One bar per token, classified with the report's thresholds
    pub fn chart(&self) -> Vec<ChartBar> {
        self.report
            .per_token()
            .iter()
            .map(|t| {
                let tier = self.thresholds.classify(t.risk_score);
                ChartBar {
                    label: t.symbol.clone(),
                    risk_score: t.risk_score,
                    tier,
                    fill: tier.colors().fill,
                }
            })
            .collect()
    }

    /// Sum over holdings whose value is known; `None` if none is known or
    /// the sum overflows
    pub fn total_value_usd(&self) -> Option<Decimal> {
        let mut values = self.holdings.iter().filter_map(EnrichedHolding::value_usd).peekable();
        values.peek()?;
        values
            .try_fold(Decimal::ZERO, Decimal::checked_add)
            .map(|v| v.round_dp(2))
    }

    /// Plain-text document for download
    pub fn render_text(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "SafeSage AI Risk Analysis");
        let _ = writeln!(out, "Generated on {}", self.generated_at.format("%Y-%m-%d %H:%M UTC"));
        let _ = writeln!(out);
        let _ = writeln!(out, "Average Risk Score: {}", self.score_display());
        let _ = writeln!(out, "Risk Level: {}", self.report.overall_tier());
        let _ = writeln!(out, "{}", self.headline());
        if let Some(total) = self.total_value_usd() {
            let _ = writeln!(out, "Known Portfolio Value: ${total}");
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "Token Risk Breakdown");

        for token in self.report.per_token() {
            let _ = writeln!(
                out,
                "- {} ({}): {:.1}/{}",
                token.name, token.symbol, token.risk_score, self.scale.max
            );
            let _ = writeln!(out, "  {}", token.explanation);
            if let Some(suggestions) = &token.suggestions {
                let _ = writeln!(out, "  Suggestions: {suggestions}");
            }
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "{DISCLAIMER}");
        out
    }

    /// JSON document for sharing
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::model::{Holding, TokenAnalysis};
    use rust_decimal_macros::dec;

    fn snapshot() -> ReportSnapshot {
        let holdings = vec![
            EnrichedHolding::priced(Holding::new("Ethereum", "ETH", dec!(2)), dec!(3450)),
            EnrichedHolding::unpriced(Holding::new("Bitcoin", "BTC", dec!(0.1))),
        ];
        let report = aggregate(vec![
            TokenAnalysis::new("Ethereum", "ETH", 2.0, "Blue chip").with_suggestions("Hold"),
            TokenAnalysis::new("Bitcoin", "BTC", 8.0, "Volatile"),
        ]);
        ReportSnapshot::new(RunId(7), holdings, report)
    }

    #[test]
    fn test_headline_and_badge() {
        let snap = snapshot();
        assert_eq!(snap.headline(), "Your portfolio has a moderate overall risk score.");

        let badge = snap.badge();
        assert_eq!(badge.label, "Moderate Risk");
        assert_eq!(badge.score, "5.0");
        assert_eq!(badge.colors.fill, "#F6E05E");
        assert_eq!(badge.colors.text, "#975A16");
    }

    #[test]
    fn test_chart_bars_coloured_per_token() {
        let bars = snapshot().chart();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].label, "ETH");
        assert_eq!(bars[0].fill, "#68D391");
        assert_eq!(bars[1].tier, RiskTier::High);
        assert_eq!(bars[1].fill, "#F56565");
    }

    #[test]
    fn test_total_value_skips_unpriced() {
        assert_eq!(snapshot().total_value_usd(), Some(dec!(6900)));

        let unpriced = ReportSnapshot::new(
            RunId(1),
            vec![EnrichedHolding::unpriced(Holding::new("Ethereum", "ETH", dec!(1)))],
            aggregate(vec![TokenAnalysis::new("Ethereum", "ETH", 3.0, "ok")]),
        );
        assert_eq!(unpriced.total_value_usd(), None);
    }

    #[test]
    fn test_total_value_overflow_is_unknown() {
        let huge = Decimal::from_scientific("7e28").unwrap();
        let snap = ReportSnapshot::new(
            RunId(1),
            vec![
                EnrichedHolding::priced(Holding::new("Ethereum", "ETH", huge), dec!(1)),
                EnrichedHolding::priced(Holding::new("Bitcoin", "BTC", huge), dec!(1)),
            ],
            aggregate(vec![TokenAnalysis::new("Ethereum", "ETH", 3.0, "ok")]),
        );
        assert_eq!(snap.total_value_usd(), None);
        assert!(!snap.render_text().contains("Known Portfolio Value"));
    }

    #[test]
    fn test_grading_drives_chart_and_text() {
        let scale = ScoreScale { min: 0.0, max: 100.0 };
        let snap = ReportSnapshot::new(
            RunId(1),
            Vec::new(),
            aggregate(vec![TokenAnalysis::new("Ethereum", "ETH", 45.0, "ok")]),
        )
        .with_grading(scale, TierThresholds::for_scale(scale));

        assert_eq!(snap.chart()[0].tier, RiskTier::Moderate);
        assert!(snap.render_text().contains("45.0/100"));
    }

    #[test]
    fn test_render_text() {
        let text = snapshot().render_text();
        assert!(text.contains("Average Risk Score: 5.0"));
        assert!(text.contains("Risk Level: Moderate"));
        assert!(text.contains("- Ethereum (ETH): 2.0/10"));
        assert!(text.contains("Suggestions: Hold"));
        assert!(text.contains("Known Portfolio Value: $6900"));
        assert!(text.trim_end().ends_with(DISCLAIMER));
    }

    #[test]
    fn test_json_export_shape() {
        let json: serde_json::Value = serde_json::from_str(&snapshot().to_json().unwrap()).unwrap();
        assert_eq!(json["runId"], 7);
        assert_eq!(json["report"]["overallTier"], "Moderate");
        assert_eq!(json["report"]["perToken"][0]["riskScore"], 2.0);
        assert_eq!(json["holdings"][0]["symbol"], "ETH");
    }
}

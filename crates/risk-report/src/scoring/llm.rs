//! LLM-backed Risk Scorer
//!
//! Sends the holdings to an `LlmProvider` with a fixed scoring prompt and
//! parses the JSON array it answers with.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use sage_core::{GenerationOptions, LlmProvider, Message};

use super::{RiskScorer, ScoreScale, normalize_analyses};
use crate::error::{ReportError, Result, Upstream};
use crate::model::{Holding, TokenAnalysis};
use crate::RISK_SCORING_PROMPT;

pub struct LlmRiskScorer {
    provider: Arc<dyn LlmProvider>,
    options: GenerationOptions,
    scale: ScoreScale,
}

#[derive(Serialize)]
struct ScoringRequestItem<'a> {
    name: &'a str,
    symbol: &'a str,
    balance: String,
}

impl LlmRiskScorer {
    pub fn new(provider: Arc<dyn LlmProvider>, options: GenerationOptions) -> Self {
        Self {
            provider,
            options,
            scale: ScoreScale::default(),
        }
    }

    #[must_use]
    pub const fn with_scale(mut self, scale: ScoreScale) -> Self {
        self.scale = scale;
        self
    }

    fn build_messages(&self, holdings: &[Holding]) -> Result<Vec<Message>> {
        let items: Vec<_> = holdings
            .iter()
            .map(|h| ScoringRequestItem {
                name: &h.name,
                symbol: &h.symbol,
                balance: h.balance.normalize().to_string(),
            })
            .collect();

        let payload = serde_json::to_string_pretty(&items)?;
        let system = RISK_SCORING_PROMPT
            .replace("{min}", &self.scale.min.to_string())
            .replace("{max}", &self.scale.max.to_string());

        Ok(vec![
            Message::system(system),
            Message::user(format!("Analyze these wallet holdings:\n{payload}")),
        ])
    }
}

#[async_trait]
impl RiskScorer for LlmRiskScorer {
    async fn score(&self, holdings: &[Holding]) -> Result<Vec<TokenAnalysis>> {
        let messages = self.build_messages(holdings)?;

        tracing::debug!(
            provider = self.provider.name(),
            model = %self.options.model,
            tokens = holdings.len(),
            "Requesting AI risk analysis"
        );

        let completion = self
            .provider
            .complete(&messages, &self.options)
            .await?;

        let analyses = parse_analyses(&completion.content)?;
        normalize_analyses(holdings, analyses, self.scale)
    }

    fn name(&self) -> &str {
        self.provider.name()
    }

    fn scale(&self) -> ScoreScale {
        self.scale
    }
}

/// Pull the analysis array out of a model reply.
///
/// Accepts a bare array, an array inside a ```json fence, or an object whose
/// first array-valued field holds the analyses.
pub(crate) fn parse_analyses(content: &str) -> Result<Vec<TokenAnalysis>> {
    let body = fenced_block(content).unwrap_or(content).trim();

    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => {
            let (Some(start), Some(end)) = (body.find('['), body.rfind(']')) else {
                return Err(ReportError::malformed(Upstream::RiskScoring, "no JSON array in reply"));
            };
            if end < start {
                return Err(ReportError::malformed(Upstream::RiskScoring, "no JSON array in reply"));
            }
            serde_json::from_str(&body[start..=end])
                .map_err(|e| ReportError::malformed(Upstream::RiskScoring, e.to_string()))?
        }
    };

    let array = match value {
        serde_json::Value::Array(_) => value,
        serde_json::Value::Object(map) => map
            .into_iter()
            .map(|(_, v)| v)
            .find(serde_json::Value::is_array)
            .ok_or_else(|| ReportError::malformed(Upstream::RiskScoring, "object reply has no array field"))?,
        _ => return Err(ReportError::malformed(Upstream::RiskScoring, "reply is not an array")),
    };

    serde_json::from_value(array).map_err(|e| ReportError::malformed(Upstream::RiskScoring, e.to_string()))
}

fn fenced_block(content: &str) -> Option<&str> {
    let start = content.find("```")?;
    let after = &content[start + 3..];
    let body_start = after.find('\n')? + 1;
    let body = &after[body_start..];
    let end = body.find("```")?;
    Some(&body[..end])
}

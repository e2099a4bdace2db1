//! # risk-report
//!
//! Wallet risk report pipeline: turns a connected wallet into an AI-scored,
//! tiered risk report.
//!
//! ## Pipeline
//!
//! ```text
//! WalletState
//!     │
//!     ▼
//! HoldingsResolver ──▶ PriceEnricher ──▶ RiskScorer ──▶ Aggregator
//!  (no network)        (best effort)      (must succeed)  (pure)
//!                                                            │
//!                                                            ▼
//!                                    ReportSurface ◀── ReportSnapshot
//! ```
//!
//! - **Prices are decoration** - a market outage leaves every score unchanged
//! - **Scores are never invented** - a scoring failure fails the run and
//!   commits nothing
//! - **Latest run wins** - results of a superseded run are discarded
//!
//! ## Tiers
//!
//! ```text
//! 0 ────────── 3 ────────── 6 ────────── 10
//! │    Low     │  Moderate  │    High    │
//! ```

pub mod aggregate;
pub mod catalog;
pub mod enricher;
pub mod error;
pub mod market;
pub mod model;
pub mod report;
pub mod resolver;
pub mod scoring;
pub mod surface;

pub use aggregate::{TierThresholds, aggregate, aggregate_with};
pub use catalog::{SupportedToken, SupportedTokenCatalog};
pub use enricher::PriceEnricher;
pub use error::{ReportError, Result, Upstream};
pub use market::{CoinGeckoClient, CoinGeckoConfig, MarketDataClient, MockMarketClient};
pub use model::{AggregateReport, EnrichedHolding, Holding, RiskTier, TokenAnalysis, WalletState};
pub use report::ReportSnapshot;
pub use resolver::HoldingsResolver;
pub use scoring::{LlmRiskScorer, MockRiskScorer, RiskScorer, ScoreScale};
pub use surface::{ReportPipeline, ReportSurface, RunId, RunOutcome, RunState, SurfaceStatus};

/// System prompt for the LLM risk scorer
pub const RISK_SCORING_PROMPT: &str = r#"You are a cryptocurrency risk analyst for SafeSage, an educational portfolio risk tool.

## Task

For every token in the user's wallet, rate its investment risk on a scale
between {min} and {max}, where {min} is the lowest risk and {max} the highest.

Consider:
- Market capitalisation and liquidity
- Historical volatility and drawdowns
- Project maturity, adoption and regulatory exposure

## Output Format

Reply with ONLY a JSON array, one object per token, in this shape:

```json
[
  {
    "name": "Ethereum",
    "symbol": "ETH",
    "riskScore": 3,
    "explanation": "One or two sentences on why.",
    "suggestions": "One practical risk-management suggestion."
  }
]
```

Rules:
- Include every token you were given and no others
- `riskScore` is a number between {min} and {max}
- Do not add commentary outside the JSON array
- If you can only answer with a JSON object, put the array under "analysis"
- This is educational analysis, never financial advice
"#;

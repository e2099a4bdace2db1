//! Application State

use std::sync::Arc;

use risk_report::{
    CoinGeckoClient, LlmRiskScorer, MarketDataClient, MockMarketClient, MockRiskScorer,
    PriceEnricher, ReportPipeline, ReportSurface, RiskScorer,
};
use sage_core::{GenerationOptions, LlmProvider, SupportAssistant};

use crate::config::{MarketBackend, ScorerBackend, ServerConfig};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// LLM provider (Ollama, etc.)
    pub provider: Arc<dyn LlmProvider>,

    /// Market data client used by the enricher
    pub market: Arc<dyn MarketDataClient>,

    /// Report run state and committed reports
    pub surface: Arc<ReportSurface>,

    /// Support chat backend
    pub assistant: Arc<SupportAssistant>,

    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Wire the pipeline and assistant for the configured backends
    pub fn build(config: ServerConfig, provider: Arc<dyn LlmProvider>) -> anyhow::Result<Self> {
        let market: Arc<dyn MarketDataClient> = match config.market {
            MarketBackend::CoinGecko => Arc::new(CoinGeckoClient::from_env()?),
            MarketBackend::Mock => Arc::new(MockMarketClient::new()),
        };

        let scorer: Arc<dyn RiskScorer> = match config.scorer {
            ScorerBackend::Ollama => Arc::new(LlmRiskScorer::new(
                provider.clone(),
                GenerationOptions::structured(config.model.clone()),
            )),
            ScorerBackend::Mock => Arc::new(MockRiskScorer::new()),
        };

        Ok(Self::new(config, provider, market, scorer))
    }

    pub fn new(
        config: ServerConfig,
        provider: Arc<dyn LlmProvider>,
        market: Arc<dyn MarketDataClient>,
        scorer: Arc<dyn RiskScorer>,
    ) -> Self {
        let pipeline = ReportPipeline::new(PriceEnricher::new(market.clone()), scorer);
        let assistant = SupportAssistant::new(provider.clone(), GenerationOptions::for_model(config.model.clone()));

        Self {
            provider,
            market,
            surface: Arc::new(ReportSurface::new(pipeline)),
            assistant: Arc::new(assistant),
            config: Arc::new(config),
        }
    }
}

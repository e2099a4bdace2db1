//! CoinGecko Market Client
//!
//! `GET /coins/markets?vs_currency=usd&ids=<comma list>`

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{MarketDataClient, MarketRecord};
use crate::error::{ReportError, Result, Upstream};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoinGeckoConfig {
    pub base_url: String,

    /// Demo/pro API key, sent as `x-cg-demo-api-key`
    pub api_key: Option<String>,

    pub vs_currency: String,

    pub timeout_secs: u64,
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.coingecko.com/api/v3".into(),
            api_key: None,
            vs_currency: "usd".into(),
            timeout_secs: 10,
        }
    }
}

impl CoinGeckoConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let base_url = std::env::var("COINGECKO_BASE_URL").unwrap_or(defaults.base_url);
        let api_key = std::env::var("COINGECKO_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        let timeout_secs = std::env::var("COINGECKO_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(defaults.timeout_secs);

        Self {
            base_url,
            api_key,
            timeout_secs,
            ..defaults
        }
    }
}

pub struct CoinGeckoClient {
    http: reqwest::Client,
    config: CoinGeckoConfig,
}

impl CoinGeckoClient {
    pub fn new(config: CoinGeckoConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ReportError::Config(format!("HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(CoinGeckoConfig::from_env())
    }

    fn markets_url(&self) -> String {
        format!("{}/coins/markets", self.config.base_url.trim_end_matches('/'))
    }

    fn get(&self, url: String) -> reqwest::RequestBuilder {
        let request = self.http.get(url);
        match &self.config.api_key {
            Some(key) => request.header("x-cg-demo-api-key", key),
            None => request,
        }
    }
}

#[async_trait]
impl MarketDataClient for CoinGeckoClient {
    async fn markets_by_id(&self, ids: &[&str]) -> Result<Vec<MarketRecord>> {
        let ids = ids.join(",");
        tracing::debug!(%ids, "CoinGecko markets request");

        let response = self
            .get(self.markets_url())
            .query(&[("vs_currency", self.config.vs_currency.as_str()), ("ids", ids.as_str())])
            .send()
            .await
            .map_err(|e| ReportError::EnrichmentUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::EnrichmentUnavailable(format!(
                "CoinGecko returned HTTP {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ReportError::EnrichmentUnavailable(e.to_string()))?;

        parse_markets(&body)
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/ping", self.config.base_url.trim_end_matches('/'));
        match self.get(url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::warn!("CoinGecko health check failed: {}", e);
                false
            }
        }
    }

    fn name(&self) -> &str {
        "CoinGecko"
    }
}

/// Decode a markets response body
pub(crate) fn parse_markets(body: &str) -> Result<Vec<MarketRecord>> {
    serde_json::from_str(body).map_err(|e| ReportError::malformed(Upstream::MarketData, e.to_string()))
}

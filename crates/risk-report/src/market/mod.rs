//! Market Data Integration
//!
//! Abstraction over "list coins by id" price providers.

mod coingecko;
mod mock;

pub use coingecko::{CoinGeckoClient, CoinGeckoConfig};
pub use mock::MockMarketClient;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One record of a markets-by-id response
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketRecord {
    /// Provider coin id (e.g., "ethereum")
    #[serde(default)]
    pub id: String,

    /// Ticker, any case
    pub symbol: String,

    #[serde(default)]
    pub name: String,

    /// USD unit price; providers send null for delisted coins
    #[serde(default)]
    pub current_price: Option<Decimal>,
}

/// Market data client trait (Strategy pattern)
///
/// Implement this for each provider: CoinGecko, CoinMarketCap, etc.
#[async_trait]
pub trait MarketDataClient: Send + Sync {
    /// Fetch current market records for the given provider ids in one call
    async fn markets_by_id(&self, ids: &[&str]) -> Result<Vec<MarketRecord>>;

    /// Check if the provider is reachable
    async fn health_check(&self) -> bool;

    /// Provider name
    fn name(&self) -> &str;
}

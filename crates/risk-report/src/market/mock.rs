//! Mock Market Client
//!
//! For testing and demo purposes. Returns static prices for the catalog coins
//! and can be switched into failure mode.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::{MarketDataClient, MarketRecord};
use crate::error::{ReportError, Result};

pub struct MockMarketClient {
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl Default for MockMarketClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMarketClient {
    pub const fn new() -> Self {
        Self {
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    /// A client whose every call fails
    pub const fn failing() -> Self {
        Self {
            failing: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `markets_by_id` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// (symbol, name, price)
    fn base_price(id: &str) -> Option<(&'static str, &'static str, Decimal)> {
        match id {
            "ethereum" => Some(("eth", "Ethereum", dec!(3450))),
            "bitcoin" => Some(("btc", "Bitcoin", dec!(97500))),
            "solana" => Some(("sol", "Solana", dec!(195))),
            "cardano" => Some(("ada", "Cardano", dec!(0.95))),
            "polkadot" => Some(("dot", "Polkadot", dec!(7.20))),
            "chainlink" => Some(("link", "Chainlink", dec!(24.50))),
            "uniswap" => Some(("uni", "Uniswap", dec!(14.20))),
            "avalanche-2" => Some(("avax", "Avalanche", dec!(42.00))),
            "matic-network" => Some(("matic", "Polygon", dec!(0.52))),
            "near" => Some(("near", "NEAR Protocol", dec!(5.10))),
            "cosmos" => Some(("atom", "Cosmos", dec!(9.80))),
            "algorand" => Some(("algo", "Algorand", dec!(0.41))),
            "filecoin" => Some(("fil", "Filecoin", dec!(5.60))),
            "tezos" => Some(("xtz", "Tezos", dec!(1.30))),
            "iota" => Some(("iota", "IOTA", dec!(0.33))),
            _ => None,
        }
    }
}

#[async_trait]
impl MarketDataClient for MockMarketClient {
    async fn markets_by_id(&self, ids: &[&str]) -> Result<Vec<MarketRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.failing.load(Ordering::SeqCst) {
            return Err(ReportError::EnrichmentUnavailable("mock market is down".into()));
        }

        Ok(ids
            .iter()
            .filter_map(|id| {
                Self::base_price(id).map(|(symbol, name, price)| MarketRecord {
                    id: (*id).to_string(),
                    symbol: symbol.into(),
                    name: name.into(),
                    current_price: Some(price),
                })
            })
            .collect())
    }

    async fn health_check(&self) -> bool {
        !self.failing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "MockMarket"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_market() {
        let market = MockMarketClient::new();

        let records = market.markets_by_id(&["ethereum", "not-a-coin"]).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].symbol, "eth");
        assert!(records[0].current_price.unwrap() > Decimal::ZERO);
        assert_eq!(market.calls(), 1);
    }

    #[tokio::test]
    async fn test_failing_mode() {
        let market = MockMarketClient::failing();
        assert!(market.markets_by_id(&["ethereum"]).await.is_err());
        assert!(!market.health_check().await);

        market.set_failing(false);
        assert!(market.markets_by_id(&["ethereum"]).await.is_ok());
        assert_eq!(market.calls(), 2);
    }
}

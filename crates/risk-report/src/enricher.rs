//! Market Price Enricher
//!
//! Best-effort: attaches current prices to holdings and never fails the run.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::catalog::SupportedTokenCatalog;
use crate::market::{MarketDataClient, MarketRecord};
use crate::model::{EnrichedHolding, Holding};

pub struct PriceEnricher {
    market: Arc<dyn MarketDataClient>,
    catalog: &'static SupportedTokenCatalog,
}

impl PriceEnricher {
    pub fn new(market: Arc<dyn MarketDataClient>) -> Self {
        Self::with_catalog(market, SupportedTokenCatalog::global())
    }

    pub fn with_catalog(market: Arc<dyn MarketDataClient>, catalog: &'static SupportedTokenCatalog) -> Self {
        Self { market, catalog }
    }

    /// Attach prices from one catalog-wide batch lookup.
    ///
    /// Any market failure is logged and every holding passes through unpriced.
    pub async fn enrich(&self, holdings: Vec<Holding>) -> Vec<EnrichedHolding> {
        if holdings.is_empty() {
            return Vec::new();
        }

        let ids = self.catalog.provider_ids();
        let records = match self.market.markets_by_id(&ids).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(provider = self.market.name(), error = %e, "Error fetching market prices");
                return holdings.into_iter().map(EnrichedHolding::unpriced).collect();
            }
        };

        tracing::debug!(records = records.len(), "Market prices received");

        holdings
            .into_iter()
            .map(|holding| {
                let price = self.find_record(&records, &holding).and_then(|r| valid_price(r, &holding));
                EnrichedHolding { holding, price }
            })
            .collect()
    }

    fn find_record<'a>(&self, records: &'a [MarketRecord], holding: &Holding) -> Option<&'a MarketRecord> {
        records
            .iter()
            .find(|r| r.symbol.eq_ignore_ascii_case(&holding.symbol))
            .or_else(|| {
                let provider_id = self.catalog.by_symbol(&holding.symbol)?.provider_id;
                records.iter().find(|r| r.id == provider_id)
            })
    }
}

fn valid_price(record: &MarketRecord, holding: &Holding) -> Option<Decimal> {
    match record.current_price {
        Some(price) if price >= Decimal::ZERO => Some(price),
        Some(price) => {
            tracing::warn!(symbol = %holding.symbol, %price, "Ignoring negative market price");
            None
        }
        None => None,
    }
}

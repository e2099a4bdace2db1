//! Supported Token Catalog
//!
//! Static mapping from canonical ticker to market-data provider id.

use once_cell::sync::Lazy;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedToken {
    pub name: &'static str,
    pub symbol: &'static str,
    /// CoinGecko coin id
    pub provider_id: &'static str,
}

const fn token(name: &'static str, symbol: &'static str, provider_id: &'static str) -> SupportedToken {
    SupportedToken {
        name,
        symbol,
        provider_id,
    }
}

#[derive(Debug, Serialize)]
pub struct SupportedTokenCatalog {
    tokens: Vec<SupportedToken>,
}

static DEFAULT_CATALOG: Lazy<SupportedTokenCatalog> = Lazy::new(|| {
    SupportedTokenCatalog::new(vec![
        token("Ethereum", "ETH", "ethereum"),
        token("Bitcoin", "BTC", "bitcoin"),
        token("MoveVM", "MOVE", "move-vm"),
        token("IOTA", "MIOTA", "iota"),
        token("Solana", "SOL", "solana"),
        token("Cardano", "ADA", "cardano"),
        token("Polkadot", "DOT", "polkadot"),
        token("Chainlink", "LINK", "chainlink"),
        token("Uniswap", "UNI", "uniswap"),
        token("Avalanche", "AVAX", "avalanche-2"),
        token("Polygon", "MATIC", "matic-network"),
        token("Near Protocol", "NEAR", "near"),
        token("Cosmos", "ATOM", "cosmos"),
        token("Algorand", "ALGO", "algorand"),
        token("Filecoin", "FIL", "filecoin"),
        token("Tezos", "XTZ", "tezos"),
    ])
});

impl SupportedTokenCatalog {
    pub const fn new(tokens: Vec<SupportedToken>) -> Self {
        Self { tokens }
    }

    /// Process-wide catalog, built on first use
    pub fn global() -> &'static Self {
        &DEFAULT_CATALOG
    }

    pub fn tokens(&self) -> &[SupportedToken] {
        &self.tokens
    }

    /// Case-insensitive lookup by ticker
    pub fn by_symbol(&self, symbol: &str) -> Option<&SupportedToken> {
        self.tokens
            .iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
    }

    pub fn by_provider_id(&self, provider_id: &str) -> Option<&SupportedToken> {
        self.tokens
            .iter()
            .find(|t| t.provider_id.eq_ignore_ascii_case(provider_id))
    }

    /// Every provider id, in catalog order
    pub fn provider_ids(&self) -> Vec<&'static str> {
        self.tokens.iter().map(|t| t.provider_id).collect()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

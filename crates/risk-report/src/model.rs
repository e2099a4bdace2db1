//! Domain Models
//!
//! Core data types of the risk report pipeline.
//! Balances and prices use `rust_decimal`; risk scores are plain `f64` ratings.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Wallet connection state, passed in explicitly by the caller
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletState {
    pub is_connected: bool,

    #[serde(default)]
    pub address: Option<String>,

    /// Native balance as a decimal string (e.g., "0.42")
    #[serde(default)]
    pub balance: String,

    #[serde(default)]
    pub chain_id: Option<u64>,
}

impl WalletState {
    pub fn connected(address: impl Into<String>, balance: impl Into<String>, chain_id: u64) -> Self {
        Self {
            is_connected: true,
            address: Some(address.into()),
            balance: balance.into(),
            chain_id: Some(chain_id),
        }
    }

    pub fn disconnected() -> Self {
        Self::default()
    }
}

/// A token the connected wallet holds
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub name: String,

    /// Uppercase ticker (e.g., "ETH")
    pub symbol: String,

    /// Units held, never negative
    pub balance: Decimal,
}

impl Holding {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, balance: Decimal) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into().to_uppercase(),
            balance,
        }
    }
}

/// A holding with its current unit price, when the market lookup found one
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedHolding {
    #[serde(flatten)]
    pub holding: Holding,

    /// USD unit price; `None` means unknown, not zero
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
}

impl EnrichedHolding {
    pub const fn unpriced(holding: Holding) -> Self {
        Self {
            holding,
            price: None,
        }
    }

    pub const fn priced(holding: Holding, price: Decimal) -> Self {
        Self {
            holding,
            price: Some(price),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.holding.symbol
    }

    /// Position value in USD, only when the price is known and the product
    /// fits in a `Decimal`
    pub fn value_usd(&self) -> Option<Decimal> {
        self.price.and_then(|p| p.checked_mul(self.holding.balance))
    }
}

/// Per-token result from the risk scoring capability
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAnalysis {
    #[serde(default)]
    pub name: String,

    pub symbol: String,

    pub risk_score: f64,

    pub explanation: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<String>,
}

impl TokenAnalysis {
    pub fn new(
        name: impl Into<String>,
        symbol: impl Into<String>,
        risk_score: f64,
        explanation: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            risk_score,
            explanation: explanation.into(),
            suggestions: None,
        }
    }

    #[must_use]
    pub fn with_suggestions(mut self, suggestions: impl Into<String>) -> Self {
        self.suggestions = Some(suggestions.into());
        self
    }
}

/// Discrete risk classification
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Moderate,
    High,
}

impl RiskTier {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Moderate => "Moderate",
            Self::High => "High",
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Reduction of per-token scores into one verdict.
///
/// Only `aggregate::aggregate` builds one, so the overall figures always match
/// `per_token`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateReport {
    per_token: Vec<TokenAnalysis>,
    overall_score: f64,
    overall_tier: RiskTier,
    empty_wallet: bool,
}

impl AggregateReport {
    pub(crate) const fn from_parts(
        per_token: Vec<TokenAnalysis>,
        overall_score: f64,
        overall_tier: RiskTier,
        empty_wallet: bool,
    ) -> Self {
        Self {
            per_token,
            overall_score,
            overall_tier,
            empty_wallet,
        }
    }

    pub fn per_token(&self) -> &[TokenAnalysis] {
        &self.per_token
    }

    pub const fn overall_score(&self) -> f64 {
        self.overall_score
    }

    pub const fn overall_tier(&self) -> RiskTier {
        self.overall_tier
    }

    /// True when the report is the "nothing to assess" sentinel
    pub const fn is_empty_wallet(&self) -> bool {
        self.empty_wallet
    }
}

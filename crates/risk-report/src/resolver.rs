//! Holdings Resolver
//!
//! Turns wallet connection state into the tokens the wallet actually holds.
//! Only the chain's native balance is resolved today; the catalog supplies the
//! asset's display name.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::catalog::SupportedTokenCatalog;
use crate::error::{ReportError, Result};
use crate::model::{Holding, WalletState};

/// Native asset ticker for a chain id. Unknown or missing ids fall back to ETH.
pub const fn native_symbol(chain_id: Option<u64>) -> &'static str {
    match chain_id {
        Some(137 | 80_002) => "MATIC",
        Some(43_114 | 43_113) => "AVAX",
        _ => "ETH",
    }
}

/// Parse a wallet balance string. Accepts plain and scientific notation.
pub fn parse_balance(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

pub struct HoldingsResolver {
    catalog: &'static SupportedTokenCatalog,
}

impl Default for HoldingsResolver {
    fn default() -> Self {
        Self::new(SupportedTokenCatalog::global())
    }
}

impl HoldingsResolver {
    pub const fn new(catalog: &'static SupportedTokenCatalog) -> Self {
        Self { catalog }
    }

    /// Resolve the holdings of a connected wallet.
    ///
    /// Fails with `NotConnected` when the wallet is disconnected or has no
    /// address. A zero balance is not an error: it yields no holdings.
    pub fn resolve(&self, wallet: &WalletState) -> Result<Vec<Holding>> {
        let has_address = wallet
            .address
            .as_deref()
            .is_some_and(|a| !a.trim().is_empty());
        if !wallet.is_connected || !has_address {
            return Err(ReportError::NotConnected);
        }

        let Some(balance) = parse_balance(&wallet.balance) else {
            tracing::warn!(balance = %wallet.balance, "Unparseable wallet balance, treating as empty");
            return Ok(Vec::new());
        };

        if balance < Decimal::ZERO {
            tracing::warn!(%balance, "Negative wallet balance, treating as empty");
            return Ok(Vec::new());
        }

        if balance.is_zero() {
            tracing::debug!("Wallet has no native balance");
            return Ok(Vec::new());
        }

        let symbol = native_symbol(wallet.chain_id);
        let name = self
            .catalog
            .by_symbol(symbol)
            .map_or(symbol, |t| t.name);

        tracing::debug!(%symbol, %balance, "Resolved native holding");
        Ok(vec![Holding::new(name, symbol, balance)])
    }
}

//! Server Configuration
//!
//! Read from the environment (after `dotenvy` has loaded `.env`).

use std::str::FromStr;

/// Which risk scorer backs `/api/report`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScorerBackend {
    #[default]
    Ollama,
    Mock,
}

/// Which market data client enriches holdings
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MarketBackend {
    #[default]
    CoinGecko,
    Mock,
}

impl FromStr for ScorerBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "mock" => Ok(Self::Mock),
            other => Err(format!("unknown scorer backend '{other}'")),
        }
    }
}

impl FromStr for MarketBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "coingecko" => Ok(Self::CoinGecko),
            "mock" => Ok(Self::Mock),
            other => Err(format!("unknown market backend '{other}'")),
        }
    }
}

impl ScorerBackend {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::Mock => "mock",
        }
    }
}

impl MarketBackend {
    pub const fn name(self) -> &'static str {
        match self {
            Self::CoinGecko => "coingecko",
            Self::Mock => "mock",
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub model: String,
    pub scorer: ScorerBackend,
    pub market: MarketBackend,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".into(),
            model: "llama3.2".into(),
            scorer: ScorerBackend::default(),
            market: MarketBackend::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            model: std::env::var("SAGE_MODEL").unwrap_or(defaults.model),
            scorer: parse_var("SAGE_SCORER", defaults.scorer),
            market: parse_var("SAGE_MARKET", defaults.market),
        }
    }
}

/// Unknown values fall back to the default with a warning
fn parse_var<T>(key: &str, default: T) -> T
where
    T: FromStr<Err = String>,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            tracing::warn!(key, error = %e, "Invalid configuration value, using default");
            default
        }),
        Err(_) => default,
    }
}

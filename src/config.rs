//! Service configuration loaded from environment variables.
//!
//! - `MARKET_CURRENCY`: currency of newly created wallets (default `NGN`)
//! - `MARKET_SETTLEMENT_CURRENCY`: currency orders are priced in (default `TRY`)
//! - `MARKET_WITHDRAWAL_FEE_BPS`: withdrawal fee in basis points (unset means free)
//! - `MARKET_TOKEN_TTL_SECS`: lifetime of completion tokens (default one hour)

use std::sync::Arc;
use thiserror::Error;

use crate::Currency;
use crate::wallet::{NoFee, PercentageFee, WithdrawalFeePolicy};

const DEFAULT_TOKEN_TTL_SECS: i64 = 3_600;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub default_currency: Currency,
    pub settlement_currency: Currency,
    pub withdrawal_fee_bps: Option<u32>,
    pub token_ttl: chrono::Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_currency: Currency::Ngn,
            settlement_currency: Currency::Try,
            withdrawal_fee_bps: None,
            token_ttl: chrono::Duration::seconds(DEFAULT_TOKEN_TTL_SECS),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from any variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = AppConfig::default();

        let default_currency = match var("MARKET_CURRENCY") {
            Some(v) => parse_currency("MARKET_CURRENCY", &v)?,
            None => defaults.default_currency,
        };
        let settlement_currency = match var("MARKET_SETTLEMENT_CURRENCY") {
            Some(v) => parse_currency("MARKET_SETTLEMENT_CURRENCY", &v)?,
            None => defaults.settlement_currency,
        };
        let withdrawal_fee_bps = match var("MARKET_WITHDRAWAL_FEE_BPS") {
            Some(v) => Some(parse_number::<u32>("MARKET_WITHDRAWAL_FEE_BPS", &v)?),
            None => None,
        };
        let token_ttl = match var("MARKET_TOKEN_TTL_SECS") {
            Some(v) => {
                let secs = parse_number::<u32>("MARKET_TOKEN_TTL_SECS", &v)?;
                chrono::Duration::seconds(secs as i64)
            }
            None => defaults.token_ttl,
        };

        Ok(Self {
            default_currency,
            settlement_currency,
            withdrawal_fee_bps,
            token_ttl,
        })
    }

    pub fn fee_policy(&self) -> Arc<dyn WithdrawalFeePolicy> {
        match self.withdrawal_fee_bps {
            Some(bps) => Arc::new(PercentageFee { bps }),
            None => Arc::new(NoFee),
        }
    }
}

fn parse_currency(var: &'static str, value: &str) -> Result<Currency, ConfigError> {
    value
        .parse()
        .map_err(|reason| ConfigError::Invalid { var, reason })
}

fn parse_number<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })
}

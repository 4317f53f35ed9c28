//! Currency conversion seam used when pricing a cart.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

use crate::{Amount, Currency};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("no conversion rate from {from} to {to}")]
    Unavailable { from: Currency, to: Currency },
}

/// Converts an amount between currencies. Implemented by the payment provider integration.
#[async_trait]
pub trait CurrencyConverter: Send + Sync {
    async fn convert(
        &self,
        amount: Amount,
        from: Currency,
        to: Currency,
    ) -> Result<Amount, ConversionError>;
}

/// Converter backed by a static rate table.
#[derive(Debug, Clone, Default)]
pub struct FixedRateConverter {
    rates: HashMap<(Currency, Currency), f64>,
}

impl FixedRateConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `1 from = rate to`. The inverse rate is registered as well.
    pub fn with_rate(mut self, from: Currency, to: Currency, rate: f64) -> Self {
        self.rates.insert((from, to), rate);
        self.rates.insert((to, from), 1.0 / rate);
        self
    }
}

#[async_trait]
impl CurrencyConverter for FixedRateConverter {
    async fn convert(
        &self,
        amount: Amount,
        from: Currency,
        to: Currency,
    ) -> Result<Amount, ConversionError> {
        if from == to {
            return Ok(amount);
        }
        let rate = self
            .rates
            .get(&(from, to))
            .ok_or(ConversionError::Unavailable { from, to })?;
        Ok(Amount::from_minor((amount.minor() as f64 * rate).round() as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_currency_is_identity() {
        let converter = FixedRateConverter::new();
        let amount = Amount::from_minor(1234);
        assert_eq!(
            converter.convert(amount, Currency::Try, Currency::Try).await,
            Ok(amount)
        );
    }

    #[tokio::test]
    async fn converts_with_rate_and_inverse() {
        let converter = FixedRateConverter::new().with_rate(Currency::Usd, Currency::Try, 32.0);
        assert_eq!(
            converter
                .convert(Amount::from_minor(100), Currency::Usd, Currency::Try)
                .await,
            Ok(Amount::from_minor(3200))
        );
        assert_eq!(
            converter
                .convert(Amount::from_minor(3200), Currency::Try, Currency::Usd)
                .await,
            Ok(Amount::from_minor(100))
        );
    }

    #[tokio::test]
    async fn missing_rate_is_unavailable() {
        let converter = FixedRateConverter::new();
        assert_eq!(
            converter
                .convert(Amount::from_minor(100), Currency::Gbp, Currency::Try)
                .await,
            Err(ConversionError::Unavailable {
                from: Currency::Gbp,
                to: Currency::Try
            })
        );
    }
}

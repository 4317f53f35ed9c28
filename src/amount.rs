use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Signed monetary value in currency minor units (kobo, kuruş, cents).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    const SCALE: i64 = 100;

    pub const ZERO: Amount = Amount(0);

    /// Convert a major-unit value (e.g. `10.5`) into minor units, rounding half away from zero.
    pub fn from_major(value: f64) -> Self {
        Amount((value * Self::SCALE as f64).round() as i64)
    }

    pub fn from_minor(value: i64) -> Self {
        Amount(value)
    }

    pub fn minor(self) -> i64 {
        self.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_sub(rhs.0).map(Amount)
    }

    pub fn checked_mul(self, factor: i64) -> Option<Amount> {
        self.0.checked_mul(factor).map(Amount)
    }

    /// Proportion of this amount in basis points (1/100 of a percent), rounded half-up.
    pub fn percent_bps(self, bps: u32) -> Amount {
        let scaled = self.0 as i128 * bps as i128;
        let rounded = if scaled >= 0 {
            (scaled + 5_000) / 10_000
        } else {
            (scaled - 5_000) / 10_000
        };
        Amount(rounded as i64)
    }

    pub fn max(self, other: Amount) -> Amount {
        Amount(self.0.max(other.0))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let whole = abs / Self::SCALE as u64;
        let frac = abs % Self::SCALE as u64;
        write!(f, "{sign}{whole}.{frac:02}")
    }
}

impl std::ops::Add for Amount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Amount {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Amount(self.0 - rhs.0)
    }
}

impl std::ops::Neg for Amount {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Amount(-self.0)
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, |acc, a| acc + a)
    }
}

/// ISO 4217 currencies the marketplace settles in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Ngn,
    Try,
    Usd,
    Eur,
    Gbp,
}

impl Currency {
    pub fn code(self) -> &'static str {
        match self {
            Currency::Ngn => "NGN",
            Currency::Try => "TRY",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NGN" => Ok(Currency::Ngn),
            "TRY" => Ok(Currency::Try),
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "GBP" => Ok(Currency::Gbp),
            other => Err(format!("unsupported currency '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_minor_preserves_value() {
        assert_eq!(Amount::from_minor(12345), Amount(12345));
    }

    #[test]
    fn from_major_converts_correctly() {
        assert_eq!(Amount::from_major(100.0), Amount::from_minor(10_000));
        assert_eq!(Amount::from_major(1.5), Amount::from_minor(150));
        assert_eq!(Amount::from_major(0.01), Amount::from_minor(1));
    }

    #[test]
    fn from_major_rounds_correctly() {
        assert_eq!(Amount::from_major(1.234), Amount::from_minor(123));
        assert_eq!(Amount::from_major(1.236), Amount::from_minor(124));
        assert_eq!(Amount::from_major(-50.25), Amount::from_minor(-5025));
    }

    #[test]
    fn display_formats_major_units() {
        assert_eq!(Amount::from_minor(7000).to_string(), "70.00");
        assert_eq!(Amount::from_minor(5).to_string(), "0.05");
        assert_eq!(Amount::from_minor(-1250).to_string(), "-12.50");
        assert_eq!(Amount::ZERO.to_string(), "0.00");
    }

    #[test]
    fn checked_arithmetic_detects_overflow() {
        assert_eq!(Amount(i64::MAX).checked_add(Amount(1)), None);
        assert_eq!(Amount(i64::MIN).checked_sub(Amount(1)), None);
        assert_eq!(Amount(40).checked_sub(Amount(50)), Some(Amount(-10)));
    }

    #[test]
    fn percent_bps_rounds_half_up() {
        // 5% of 1000
        assert_eq!(Amount(1000).percent_bps(500), Amount(50));
        // 5% of 333 = 16.65
        assert_eq!(Amount(333).percent_bps(500), Amount(17));
        // 5% of 330 = 16.5
        assert_eq!(Amount(330).percent_bps(500), Amount(17));
        assert_eq!(Amount(0).percent_bps(500), Amount::ZERO);
    }

    #[test]
    fn sum_adds_all_amounts() {
        let total: Amount = [Amount(10), Amount(20), Amount(-5)].into_iter().sum();
        assert_eq!(total, Amount(25));
    }

    #[test]
    fn currency_parses_case_insensitively() {
        assert_eq!("try".parse::<Currency>(), Ok(Currency::Try));
        assert_eq!(" NGN ".parse::<Currency>(), Ok(Currency::Ngn));
        assert!("XYZ".parse::<Currency>().is_err());
    }
}

//! Decimal prices in a single store currency.
//!
//! Catalog prices are stored as `NUMERIC(10, 2)` and converted to integer
//! minor units only at the payment-provider boundary.

use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Errors produced when converting prices.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriceError {
    #[error("price cannot be negative: {0}")]
    Negative(Decimal),
    #[error("price {0} does not fit in minor units")]
    Overflow(Decimal),
    #[error("unsupported currency code: {0}")]
    UnknownCurrency(String),
}

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (dollars, not cents).
    pub amount: Decimal,
    pub currency_code: CurrencyCode,
}

impl Price {
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// A zero amount in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// Amount in minor units (cents), rounded half-up to two places.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` for negative amounts and
    /// `PriceError::Overflow` if the value does not fit in an `i64`.
    pub fn to_minor_units(&self) -> Result<i64, PriceError> {
        if self.amount.is_sign_negative() && !self.amount.is_zero() {
            return Err(PriceError::Negative(self.amount));
        }
        let cents = (self.rounded() * Decimal::ONE_HUNDRED).trunc();
        cents.to_i64().ok_or(PriceError::Overflow(self.amount))
    }

    fn rounded(&self) -> Decimal {
        self.amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Add another price of the same currency.
    ///
    /// The currency of `self` wins; the store only ever runs one currency.
    #[must_use]
    pub fn plus(self, other: Self) -> Self {
        Self::new(self.amount + other.amount, self.currency_code)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:.2}",
            self.currency_code.symbol(),
            self.rounded()
        )
    }
}

/// ISO 4217 currency codes the store can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    SGD,
}

impl CurrencyCode {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::USD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
            Self::SGD => "S$",
        }
    }

    /// Lowercase code as expected by Stripe (`usd`).
    #[must_use]
    pub const fn provider_code(self) -> &'static str {
        match self {
            Self::USD => "usd",
            Self::EUR => "eur",
            Self::GBP => "gbp",
            Self::SGD => "sgd",
        }
    }
}

impl FromStr for CurrencyCode {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "usd" => Ok(Self::USD),
            "eur" => Ok(Self::EUR),
            "gbp" => Ok(Self::GBP),
            "sgd" => Ok(Self::SGD),
            other => Err(PriceError::UnknownCurrency(other.to_owned())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn usd(s: &str) -> Price {
        Price::new(s.parse().unwrap(), CurrencyCode::USD)
    }

    #[test]
    fn minor_units_round_to_cents() {
        assert_eq!(usd("12.50").to_minor_units().unwrap(), 1250);
        assert_eq!(usd("0.005").to_minor_units().unwrap(), 1);
        assert_eq!(usd("7").to_minor_units().unwrap(), 700);
    }

    #[test]
    fn negative_prices_are_rejected() {
        assert!(matches!(
            usd("-1.00").to_minor_units(),
            Err(PriceError::Negative(_))
        ));
    }

    #[test]
    fn display_uses_symbol_and_two_places() {
        assert_eq!(usd("3").to_string(), "$3.00");
        assert_eq!(usd("3").plus(usd("4.5")).to_string(), "$7.50");
    }

    #[test]
    fn currency_parses_case_insensitively() {
        assert_eq!("USD".parse::<CurrencyCode>().unwrap(), CurrencyCode::USD);
        assert_eq!(" gbp ".parse::<CurrencyCode>().unwrap(), CurrencyCode::GBP);
        assert!("doubloons".parse::<CurrencyCode>().is_err());
    }
}

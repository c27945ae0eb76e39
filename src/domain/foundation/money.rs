//! Monetary amounts and minor-unit conversion.
//!
//! Amounts are exact decimals in major units (118.00 PEN). Gateways take
//! integer minor units (11800), and every conversion goes through
//! [`Money::to_minor_units`] so rounding is identical across providers.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// Number of minor units per major unit for the supported currencies.
const MINOR_UNIT_SCALE: u32 = 2;

/// An amount of money in a specific currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: String,
}

impl Money {
    /// Creates a non-negative amount in an ISO-4217 currency.
    pub fn new(amount: Decimal, currency: impl AsRef<str>) -> Result<Self, ValidationError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(ValidationError::invalid_format(
                "amount",
                "must not be negative",
            ));
        }
        Ok(Self {
            amount,
            currency: normalize_currency(currency.as_ref())?,
        })
    }

    /// Rebuilds an amount from integer minor units.
    pub fn from_minor_units(minor: i64, currency: impl AsRef<str>) -> Result<Self, ValidationError> {
        Self::new(Decimal::new(minor, MINOR_UNIT_SCALE), currency)
    }

    /// Converts to integer minor units, rounding half away from zero.
    pub fn to_minor_units(&self) -> Result<i64, ValidationError> {
        let scaled = (self.amount * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        scaled.to_i64().ok_or_else(|| {
            ValidationError::invalid_format("amount", "exceeds the supported range")
        })
    }

    /// The amount after rounding to the minor unit, still in major units.
    pub fn rounded(&self) -> Result<Decimal, ValidationError> {
        Ok(Decimal::new(self.to_minor_units()?, MINOR_UNIT_SCALE))
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self
            .amount
            .round_dp_with_strategy(MINOR_UNIT_SCALE, RoundingStrategy::MidpointAwayFromZero);
        write!(f, "{:.2} {}", rounded, self.currency)
    }
}

fn normalize_currency(code: &str) -> Result<String, ValidationError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(ValidationError::empty_field("currency"));
    }
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::invalid_format(
            "currency",
            "expected a three-letter ISO-4217 code",
        ));
    }
    Ok(code.to_ascii_uppercase())
}

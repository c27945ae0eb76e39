//! Payment gateways and payment methods.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// The external gateway that processed a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProvider {
    /// Card-charge gateway (JSON charges, hex HMAC webhooks).
    Culqi,
    /// IPN-style gateway (notifications carry only an id).
    #[serde(rename = "mercadopago")]
    MercadoPago,
    /// Payment-intent gateway (form-encoded API, timestamped signatures).
    Stripe,
}

impl PaymentProvider {
    pub const ALL: [PaymentProvider; 3] = [
        PaymentProvider::Culqi,
        PaymentProvider::MercadoPago,
        PaymentProvider::Stripe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProvider::Culqi => "culqi",
            PaymentProvider::MercadoPago => "mercadopago",
            PaymentProvider::Stripe => "stripe",
        }
    }
}

impl fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentProvider {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "culqi" => Ok(PaymentProvider::Culqi),
            "mercadopago" | "mercado_pago" => Ok(PaymentProvider::MercadoPago),
            "stripe" => Ok(PaymentProvider::Stripe),
            other => Err(ValidationError::invalid_format(
                "provider",
                format!("unknown payment provider '{}'", other),
            )),
        }
    }
}

/// How the customer paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Yape,
    BankTransfer,
    Wallet,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Yape => "yape",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Wallet => "wallet",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "card" => Ok(PaymentMethod::Card),
            "yape" => Ok(PaymentMethod::Yape),
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            "wallet" => Ok(PaymentMethod::Wallet),
            other => Err(ValidationError::invalid_format(
                "method",
                format!("unknown payment method '{}'", other),
            )),
        }
    }
}

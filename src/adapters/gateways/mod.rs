//! Payment gateway adapters.
//!
//! One `PaymentGateway` implementation per provider:
//! - `CulqiGateway` - card charges, JSON API, bearer auth
//! - `MercadoPagoGateway` - IPN-style payments, JSON API, idempotency keys
//! - `StripeGateway` - payment intents, form-encoded API, basic auth
//!
//! `MockPaymentGateway` stands in for any of them in tests.
//!
//! # Security
//!
//! - API keys are held as `secrecy::SecretString` and never logged
//! - Every client carries a request timeout; adapters never retry

mod culqi;
mod http;
mod mercadopago;
mod mock;
mod stripe;

pub use culqi::{CulqiConfig, CulqiGateway};
pub use mercadopago::{MercadoPagoConfig, MercadoPagoGateway};
pub use mock::{
    GatewayCall, MockPaymentGateway, MOCK_APPROVED, MOCK_PENDING, MOCK_REQUIRES_ACTION,
};
pub use stripe::{StripeConfig, StripeGateway};

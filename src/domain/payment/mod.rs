//! Payment module - payment attempts, their lifecycle and webhook handling.
//!
//! # Module Organization
//!
//! - `aggregate` - The `Payment` record and the shared transition function
//! - `status` - Payment status state machine
//! - `provider` - Gateway and payment method enums
//! - `reference` - `PAY-YYYYMMDD-NNNN` reference numbers
//! - `webhook_event` - Canonical webhook events
//! - `webhook_verifier` - Per-provider HMAC signature checks
//! - `errors` - Module error taxonomy

mod aggregate;
mod errors;
mod provider;
mod reference;
mod status;
mod webhook_errors;
mod webhook_event;
mod webhook_verifier;

pub use aggregate::{Payment, PaymentOutcome, Transition};
pub use errors::PaymentError;
pub use provider::{PaymentMethod, PaymentProvider};
pub use reference::ReferenceNumber;
pub use status::PaymentStatus;
pub use webhook_errors::WebhookError;
pub use webhook_event::{CanonicalEvent, EventCategory, NormalizedWebhook};
pub use webhook_verifier::{SignatureHeader, SignatureScheme, WebhookVerifier, REPLAY_WINDOW_SECS};

#[cfg(test)]
pub use webhook_verifier::sign_for_tests;

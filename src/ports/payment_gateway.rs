//! Payment gateway port for external charge processing.
//!
//! One capability interface covers all three gateways. Adapters translate the
//! canonical requests below into their provider's wire format, and report
//! every failure (transport, non-2xx, declined) as a [`GatewayError`].
//!
//! # Design
//!
//! - **One call per operation**: adapters never retry; financial calls are
//!   not blindly repeatable
//! - **Minor units on the wire**: adapters convert [`Money`] with
//!   `Money::to_minor_units` so rounding is identical everywhere
//! - **Provider classifiers**: the orchestrator maps raw provider statuses to
//!   payment statuses only through `classify`

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorCode, Money, OrderId, ValidationError};
use crate::domain::payment::{
    NormalizedWebhook, PaymentError, PaymentMethod, PaymentProvider, PaymentStatus,
};

/// Port for payment gateway integrations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// The provider this adapter talks to.
    fn provider(&self) -> PaymentProvider;

    /// Charge a tokenized payment method.
    ///
    /// Returns `Ok` only for approved or deferred charges; declines are errors.
    async fn charge(&self, request: ChargeRequest) -> Result<ChargeResult, GatewayError>;

    /// Refund a settled charge, fully or partially.
    async fn refund(&self, request: RefundRequest) -> Result<RefundResult, GatewayError>;

    /// Fetch the live status of a transaction.
    async fn get_status(&self, external_id: &str) -> Result<ProviderStatus, GatewayError>;

    /// Reduce a verified webhook payload to a canonical event.
    async fn normalize_webhook(
        &self,
        payload: &serde_json::Value,
    ) -> Result<NormalizedWebhook, GatewayError>;

    /// True when the raw status means the money is captured.
    fn is_approved(&self, status: &str) -> bool;

    /// True when the provider has deferred settlement.
    fn is_pending(&self, status: &str) -> bool;

    /// True when the customer must complete an extra step (3-D Secure etc.).
    fn requires_additional_action(&self, status: &str) -> bool;

    /// Maps a raw provider status to the payment status it implies.
    fn classify(&self, status: &str) -> PaymentStatus {
        if self.is_approved(status) {
            PaymentStatus::Completed
        } else if self.is_pending(status) || self.requires_additional_action(status) {
            PaymentStatus::Pending
        } else {
            PaymentStatus::Failed
        }
    }
}

/// Payer identity document, required by some gateways.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayerIdentification {
    #[serde(rename = "type")]
    pub kind: String,
    pub number: String,
}

/// Canonical charge request.
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub amount: Money,
    /// Tokenized card or payment method id; never raw card data.
    pub token: String,
    pub method: PaymentMethod,
    pub email: String,
    pub description: String,
    /// Payment reference number, sent as metadata and idempotency key.
    pub reference: String,
    pub order_id: OrderId,
    pub installments: Option<u32>,
    pub payment_method_id: Option<String>,
    pub identification: Option<PayerIdentification>,
    pub return_url: Option<String>,
}

/// Outcome of an accepted charge.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeResult {
    /// Gateway transaction id; the webhook correlation key.
    pub external_id: String,
    /// Raw provider status, classified with [`PaymentGateway::classify`].
    pub status: String,
    pub card_mask: Option<String>,
    pub card_brand: Option<String>,
    /// Verbatim response body.
    pub raw: serde_json::Value,
}

/// Canonical refund request.
#[derive(Debug, Clone)]
pub struct RefundRequest {
    pub external_id: String,
    pub amount: Money,
    /// True when `amount` is the whole payment.
    pub full: bool,
    pub reason: Option<String>,
    /// Stable per payment, so a retried or duplicated refund is collapsed
    /// by the provider instead of paid out twice.
    pub idempotency_key: String,
}

/// Outcome of an accepted refund.
#[derive(Debug, Clone, PartialEq)]
pub struct RefundResult {
    pub refund_id: String,
    pub status: String,
    pub raw: serde_json::Value,
}

/// Live transaction status from the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderStatus {
    pub external_id: String,
    pub status: String,
    /// Provider reason for declines.
    pub detail: Option<String>,
    pub card_mask: Option<String>,
    pub card_brand: Option<String>,
    pub raw: serde_json::Value,
}

/// Errors from gateway operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayError {
    pub provider: PaymentProvider,

    /// Error code for categorization.
    pub code: GatewayErrorCode,

    /// Human-readable message, shown to the customer for declines.
    pub message: String,

    /// Provider's error code (if available).
    pub provider_code: Option<String>,

    /// Whether the operation can be retried by the caller.
    pub retryable: bool,
}

impl GatewayError {
    pub fn new(
        provider: PaymentProvider,
        code: GatewayErrorCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    /// Transport failure; timeouts are reported with their own code.
    pub fn network(provider: PaymentProvider, err: reqwest::Error) -> Self {
        let code = if err.is_timeout() {
            GatewayErrorCode::Timeout
        } else {
            GatewayErrorCode::Network
        };
        Self::new(provider, code, format!("Gateway unreachable: {}", err))
    }

    pub fn declined(provider: PaymentProvider, message: impl Into<String>) -> Self {
        Self::new(provider, GatewayErrorCode::Declined, message)
    }

    pub fn provider_error(provider: PaymentProvider, message: impl Into<String>) -> Self {
        Self::new(provider, GatewayErrorCode::ProviderError, message)
    }

    pub fn invalid_response(provider: PaymentProvider, message: impl Into<String>) -> Self {
        Self::new(provider, GatewayErrorCode::InvalidResponse, message)
    }

    pub fn not_found(provider: PaymentProvider, external_id: &str) -> Self {
        Self::new(
            provider,
            GatewayErrorCode::NotFound,
            format!("Transaction {} not found", external_id),
        )
    }

    pub fn authentication(provider: PaymentProvider, message: impl Into<String>) -> Self {
        Self::new(provider, GatewayErrorCode::Authentication, message)
    }

    /// The amount could not be expressed in minor units.
    pub fn invalid_amount(provider: PaymentProvider, err: ValidationError) -> Self {
        Self::new(provider, GatewayErrorCode::InvalidResponse, err.to_string())
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.provider, self.code, self.message)
    }
}

impl std::error::Error for GatewayError {}

impl From<GatewayError> for PaymentError {
    fn from(err: GatewayError) -> Self {
        PaymentError::gateway(err.provider, err.message)
    }
}

impl From<GatewayError> for DomainError {
    fn from(err: GatewayError) -> Self {
        DomainError::new(ErrorCode::GatewayError, err.message)
            .with_detail("provider", err.provider.as_str())
            .with_detail("gateway_code", err.code.to_string())
    }
}

/// Gateway error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorCode {
    /// Connection refused, reset or DNS failure.
    Network,

    /// The gateway did not answer within the configured timeout.
    Timeout,

    /// The charge was declined or rejected.
    Declined,

    /// Non-2xx response from the gateway.
    ProviderError,

    /// Response body could not be interpreted.
    InvalidResponse,

    /// Transaction unknown to the gateway.
    NotFound,

    /// API credentials were rejected.
    Authentication,
}

impl GatewayErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayErrorCode::Network | GatewayErrorCode::Timeout)
    }
}

impl std::fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GatewayErrorCode::Network => "network",
            GatewayErrorCode::Timeout => "timeout",
            GatewayErrorCode::Declined => "declined",
            GatewayErrorCode::ProviderError => "provider_error",
            GatewayErrorCode::InvalidResponse => "invalid_response",
            GatewayErrorCode::NotFound => "not_found",
            GatewayErrorCode::Authentication => "authentication",
        };
        write!(f, "{}", s)
    }
}

/// Configured gateways keyed by provider.
///
/// A provider without credentials is simply absent; selecting it is a
/// validation error rather than a server error.
#[derive(Clone, Default)]
pub struct GatewayRegistry {
    gateways: HashMap<PaymentProvider, Arc<dyn PaymentGateway>>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a gateway under the provider it reports.
    pub fn register(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.gateways.insert(gateway.provider(), gateway);
        self
    }

    /// The gateway for `provider`.
    pub fn get(&self, provider: PaymentProvider) -> Result<Arc<dyn PaymentGateway>, PaymentError> {
        self.gateways.get(&provider).cloned().ok_or_else(|| {
            PaymentError::validation(
                "provider",
                format!("Payment provider {} is not configured", provider),
            )
        })
    }

    pub fn contains(&self, provider: PaymentProvider) -> bool {
        self.gateways.contains_key(&provider)
    }

    /// Registered providers in declaration order.
    pub fn providers(&self) -> Vec<PaymentProvider> {
        PaymentProvider::ALL
            .into_iter()
            .filter(|p| self.contains(*p))
            .collect()
    }
}

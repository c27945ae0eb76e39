//! HTTP DTOs (Data Transfer Objects) for payment endpoints.
//!
//! These types define the JSON request/response structure for the payments API.
//! Responses never carry raw card data or the verbatim gateway response.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::WebhookOutcome;
use crate::domain::foundation::{OrderId, PaymentId};
use crate::domain::payment::{Payment, PaymentMethod, PaymentProvider, PaymentStatus};
use crate::ports::PayerIdentification;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to pay an order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub order_id: OrderId,
    pub provider: PaymentProvider,
    /// Token from the provider's client-side library.
    pub token: String,
    pub method: PaymentMethod,
    pub email: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub installments: Option<u32>,
    #[serde(default)]
    pub payment_method_id: Option<String>,
    #[serde(default)]
    pub identification: Option<PayerIdentification>,
    #[serde(default)]
    pub return_url: Option<String>,
}

/// Request to refund a payment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundPaymentRequest {
    /// Major units; defaults to the whole payment.
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub reason: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// A payment as shown to API clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub id: PaymentId,
    pub reference_number: String,
    pub user_id: String,
    pub order_id: OrderId,
    pub status: PaymentStatus,
    pub provider: PaymentProvider,
    pub method: PaymentMethod,
    pub amount: Decimal,
    pub currency: String,
    pub external_id: Option<String>,
    pub card_mask: Option<String>,
    pub card_brand: Option<String>,
    pub error_message: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id,
            reference_number: payment.reference_number.to_string(),
            user_id: payment.user_id.to_string(),
            order_id: payment.order_id,
            status: payment.status,
            provider: payment.provider,
            method: payment.method,
            amount: payment.amount,
            currency: payment.currency,
            external_id: payment.external_id,
            card_mask: payment.card_mask,
            card_brand: payment.card_brand,
            error_message: payment.error_message,
            paid_at: payment.paid_at.map(|t| *t.as_datetime()),
            refunded_at: payment.refunded_at.map(|t| *t.as_datetime()),
            created_at: *payment.created_at.as_datetime(),
            updated_at: *payment.updated_at.as_datetime(),
        }
    }
}

/// Envelope returned to gateways for webhook deliveries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
}

impl From<WebhookOutcome> for WebhookResponse {
    fn from(outcome: WebhookOutcome) -> Self {
        Self {
            success: true,
            message: outcome.message,
            event_id: outcome.event_id,
            event_type: outcome.event_type,
        }
    }
}

impl WebhookResponse {
    /// Envelope for deliveries that were not processed.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            event_id: None,
            event_type: None,
        }
    }
}

/// Liveness probe body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Response DTO
// ════════════════════════════════════════════════════════════════════════════════

/// Standard error response for API errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error_code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: Some(details),
        }
    }
}

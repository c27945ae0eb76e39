//! Canonical webhook events.
//!
//! Every provider payload is normalized into a [`CanonicalEvent`] at the
//! boundary. Reconciliation never looks at provider field names.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{PaymentProvider, PaymentStatus};

/// Business outcome reported by a webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Succeeded,
    Failed,
    Refunded,
    /// Settlement deferred by the gateway.
    Pending,
}

impl EventCategory {
    /// The payment status this outcome drives the payment towards.
    pub fn target_status(&self) -> PaymentStatus {
        match self {
            EventCategory::Succeeded => PaymentStatus::Completed,
            EventCategory::Failed => PaymentStatus::Failed,
            EventCategory::Refunded => PaymentStatus::Refunded,
            EventCategory::Pending => PaymentStatus::Pending,
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventCategory::Succeeded => "succeeded",
            EventCategory::Failed => "failed",
            EventCategory::Refunded => "refunded",
            EventCategory::Pending => "pending",
        };
        f.write_str(s)
    }
}

/// A verified webhook, reduced to the fields reconciliation needs.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalEvent {
    pub provider: PaymentProvider,
    /// Gateway transaction id; the only correlation key to a payment.
    pub external_id: String,
    pub category: EventCategory,
    pub event_id: Option<String>,
    pub event_type: String,
    /// Decline reason for failed events.
    pub error_message: Option<String>,
    /// Verbatim payload, kept for audit.
    pub raw: serde_json::Value,
}

/// Result of normalizing a verified provider payload.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedWebhook {
    /// The event maps to a payment outcome.
    Event(CanonicalEvent),
    /// Recognized and authentic, but nothing to reconcile.
    Ignored {
        event_id: Option<String>,
        event_type: String,
        reason: String,
    },
}

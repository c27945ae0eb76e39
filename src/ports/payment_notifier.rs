//! Payment notification port.
//!
//! Notifications are best-effort. A delivery failure is logged by the caller
//! and never fails or rolls back the payment transition that triggered it.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::domain::foundation::{PaymentId, UserId};
use crate::domain::payment::{Payment, PaymentProvider};

/// The transition a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Succeeded,
    Failed,
    Refunded,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Succeeded => "payment_succeeded",
            NotificationKind::Failed => "payment_failed",
            NotificationKind::Refunded => "payment_refunded",
        }
    }
}

/// Everything a channel needs to address and render a payment notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentNotification {
    pub kind: NotificationKind,
    pub payment_id: PaymentId,
    pub reference_number: String,
    pub user_id: UserId,
    pub email: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub provider: PaymentProvider,
    pub error_message: Option<String>,
}

impl PaymentNotification {
    pub fn for_payment(kind: NotificationKind, payment: &Payment) -> Self {
        Self {
            kind,
            payment_id: payment.id,
            reference_number: payment.reference_number.to_string(),
            user_id: payment.user_id.clone(),
            email: payment.payer_email.clone(),
            amount: payment.amount,
            currency: payment.currency.clone(),
            provider: payment.provider,
            error_message: payment.error_message.clone(),
        }
    }
}

/// Notification delivery failure.
#[derive(Debug, Clone, Error)]
pub enum NotificationError {
    #[error("No recipient for {0}")]
    MissingRecipient(&'static str),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Port for one notification channel (email, push).
#[async_trait]
pub trait PaymentNotifier: Send + Sync {
    async fn notify(&self, notification: &PaymentNotification) -> Result<(), NotificationError>;
}

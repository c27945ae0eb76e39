//! Push channel that records the in-app notification in the log.
//!
//! The socket fan-out lives outside this service; the structured log line
//! carries the payload it would deliver.

use async_trait::async_trait;
use serde::Serialize;

use crate::ports::{NotificationError, NotificationKind, PaymentNotification, PaymentNotifier};

/// In-app notification payload addressed to one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushMessage {
    pub user_id: String,
    pub kind: &'static str,
    pub title: &'static str,
    pub message: String,
}

impl PushMessage {
    pub fn for_notification(notification: &PaymentNotification) -> Self {
        let amount = format!("{} {:.2}", notification.currency, notification.amount);
        let (title, message) = match notification.kind {
            NotificationKind::Succeeded => (
                "Pago exitoso",
                format!("Tu pago de {} ha sido procesado correctamente", amount),
            ),
            NotificationKind::Failed => (
                "Pago fallido",
                notification.error_message.clone().unwrap_or_else(|| {
                    "No se pudo procesar tu pago. Por favor, intenta de nuevo.".to_string()
                }),
            ),
            NotificationKind::Refunded => (
                "Reembolso procesado",
                format!("Se ha reembolsado {} a tu método de pago", amount),
            ),
        };
        Self {
            user_id: notification.user_id.to_string(),
            kind: notification.kind.as_str(),
            title,
            message,
        }
    }
}

/// Push notifier that emits the payload as a structured log event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPushNotifier;

impl LogPushNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PaymentNotifier for LogPushNotifier {
    async fn notify(&self, notification: &PaymentNotification) -> Result<(), NotificationError> {
        let push = PushMessage::for_notification(notification);
        let payload =
            serde_json::to_string(&push).map_err(|e| NotificationError::Delivery(e.to_string()))?;

        tracing::info!(
            user_id = %push.user_id,
            kind = push.kind,
            payload = %payload,
            "Push notification"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{PaymentId, UserId};
    use crate::domain::payment::PaymentProvider;
    use rust_decimal_macros::dec;

    fn notification(kind: NotificationKind) -> PaymentNotification {
        PaymentNotification {
            kind,
            payment_id: PaymentId::new(),
            reference_number: "PAY-20240115-0001".to_string(),
            user_id: UserId::new("user-9").unwrap(),
            email: None,
            amount: dec!(50),
            currency: "PEN".to_string(),
            provider: PaymentProvider::Stripe,
            error_message: None,
        }
    }

    #[test]
    fn refund_message_formats_amount() {
        let push = PushMessage::for_notification(&notification(NotificationKind::Refunded));
        assert_eq!(push.title, "Reembolso procesado");
        assert_eq!(push.message, "Se ha reembolsado PEN 50.00 a tu método de pago");
        assert_eq!(push.user_id, "user-9");
    }

    #[test]
    fn failure_without_reason_uses_generic_text() {
        let push = PushMessage::for_notification(&notification(NotificationKind::Failed));
        assert!(push.message.starts_with("No se pudo procesar tu pago"));
    }

    #[tokio::test]
    async fn log_push_always_succeeds() {
        let result = LogPushNotifier::new()
            .notify(&notification(NotificationKind::Succeeded))
            .await;
        assert!(result.is_ok());
    }
}

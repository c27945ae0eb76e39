//! SyncPaymentStatusHandler - Command handler for settling stuck payments.
//!
//! Operators use this to settle `Processing` or `Pending` attempts whose
//! webhook never arrived, by asking the gateway for the live status.

use std::sync::Arc;

use tracing::{Instrument, Span};

use crate::domain::foundation::{PaymentId, Timestamp};
use crate::domain::payment::{Payment, PaymentError, PaymentOutcome, PaymentStatus};
use crate::ports::{GatewayRegistry, PaymentRepository};

use super::PaymentTransitions;

/// Command to re-read a payment's status from its gateway.
#[derive(Debug, Clone)]
pub struct SyncPaymentStatusCommand {
    pub payment_id: PaymentId,
}

/// Handler for status sync.
pub struct SyncPaymentStatusHandler {
    payments: Arc<dyn PaymentRepository>,
    gateways: GatewayRegistry,
    transitions: PaymentTransitions,
    span: Span,
}

impl SyncPaymentStatusHandler {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        gateways: GatewayRegistry,
        transitions: PaymentTransitions,
    ) -> Self {
        Self {
            payments,
            gateways,
            transitions,
            span: tracing::info_span!("sync_payment"),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// # Errors
    ///
    /// - `NotFound` if the payment does not exist
    /// - `InvalidState` if it is settled or has no gateway id
    /// - `Gateway` if the status lookup fails
    pub async fn handle(&self, cmd: SyncPaymentStatusCommand) -> Result<Payment, PaymentError> {
        let span = tracing::info_span!(parent: &self.span, "sync", payment_id = %cmd.payment_id);
        self.sync(cmd).instrument(span).await
    }

    async fn sync(&self, cmd: SyncPaymentStatusCommand) -> Result<Payment, PaymentError> {
        let payment = self
            .payments
            .find_by_id(&cmd.payment_id)
            .await?
            .ok_or_else(|| PaymentError::payment_not_found(cmd.payment_id))?;

        if !payment.status.is_unsettled() {
            return Err(PaymentError::invalid_state(format!(
                "Payment {} is already {}",
                payment.reference_number, payment.status
            )));
        }
        let external_id = payment
            .external_id()
            .ok_or_else(|| {
                PaymentError::invalid_state(format!(
                    "Payment {} has no gateway transaction id",
                    payment.reference_number
                ))
            })?
            .to_string();

        let gateway = self.gateways.get(payment.provider)?;
        let live = gateway.get_status(&external_id).await?;
        let target = gateway.classify(&live.status);

        tracing::info!(
            payment_id = %payment.id,
            provider_status = %live.status,
            target = %target,
            "Gateway status fetched"
        );

        let outcome = PaymentOutcome {
            external_id: Some(live.external_id),
            card_mask: live.card_mask,
            card_brand: live.card_brand,
            provider_response: Some(live.raw),
            error_message: (target == PaymentStatus::Failed).then(|| {
                live.detail
                    .unwrap_or_else(|| format!("Payment failed with status: {}", live.status))
            }),
        };

        let applied = self
            .transitions
            .apply(payment, target, outcome, Timestamp::now())
            .await?;
        Ok(applied.payment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::gateways::{MockPaymentGateway, MOCK_APPROVED};
    use crate::adapters::memory::{InMemoryOrderRepository, InMemoryPaymentRepository};
    use crate::adapters::notification::RecordingNotifier;
    use crate::application::handlers::payment::NotificationDispatcher;
    use crate::domain::foundation::{Money, OrderId, UserId};
    use crate::domain::order::{Order, OrderStatus};
    use crate::domain::payment::{PaymentMethod, PaymentProvider, ReferenceNumber};
    use rust_decimal_macros::dec;

    struct Fixture {
        payments: Arc<InMemoryPaymentRepository>,
        orders: Arc<InMemoryOrderRepository>,
        gateway: MockPaymentGateway,
        handler: SyncPaymentStatusHandler,
        payment: Payment,
    }

    fn fixture(status: PaymentStatus, external_id: Option<&str>) -> Fixture {
        let payments = Arc::new(InMemoryPaymentRepository::new());
        let orders = Arc::new(InMemoryOrderRepository::new());
        let gateway = MockPaymentGateway::new(PaymentProvider::Culqi);

        let order = Order::new(UserId::new("user-1").unwrap(), "ORD-9", dec!(30.00), "PEN");
        orders.insert(order.clone());
        let now = Timestamp::now();
        let mut payment = Payment::start(
            ReferenceNumber::generate(&now, 3),
            order.user_id.clone(),
            order.id,
            PaymentProvider::Culqi,
            PaymentMethod::Card,
            Money::new(order.total, "PEN").unwrap(),
            None,
            now,
        );
        payment.status = status;
        payment.external_id = external_id.map(str::to_string);
        payments.insert(payment.clone());

        let transitions = PaymentTransitions::new(
            payments.clone(),
            orders.clone(),
            NotificationDispatcher::new(Arc::new(RecordingNotifier::new())),
        );
        let handler = SyncPaymentStatusHandler::new(
            payments.clone(),
            GatewayRegistry::new().register(Arc::new(gateway.clone())),
            transitions,
        );

        Fixture {
            payments,
            orders,
            gateway,
            handler,
            payment,
        }
    }

    #[tokio::test]
    async fn approved_live_status_completes_stuck_payment() {
        let f = fixture(PaymentStatus::Processing, Some("chr_9"));
        f.gateway.set_status("chr_9", MOCK_APPROVED, None);

        let synced = f
            .handler
            .handle(SyncPaymentStatusCommand { payment_id: f.payment.id })
            .await
            .unwrap();

        assert_eq!(synced.status, PaymentStatus::Completed);
        assert_eq!(f.orders.get(&f.payment.order_id).unwrap().status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn declined_live_status_stores_detail() {
        let f = fixture(PaymentStatus::Pending, Some("chr_9"));
        f.gateway.set_status("chr_9", "rejected", Some("Card expired"));

        let synced = f
            .handler
            .handle(SyncPaymentStatusCommand { payment_id: f.payment.id })
            .await
            .unwrap();

        assert_eq!(synced.status, PaymentStatus::Failed);
        assert_eq!(synced.error_message.as_deref(), Some("Card expired"));
    }

    #[tokio::test]
    async fn settled_payment_is_invalid_state() {
        let f = fixture(PaymentStatus::Completed, Some("chr_9"));

        let err = f
            .handler
            .handle(SyncPaymentStatusCommand { payment_id: f.payment.id })
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::InvalidState(_)));
        assert!(!f.gateway.was_called("get_status"));
    }

    #[tokio::test]
    async fn payment_without_external_id_is_invalid_state() {
        let f = fixture(PaymentStatus::Processing, None);

        let err = f
            .handler
            .handle(SyncPaymentStatusCommand { payment_id: f.payment.id })
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::InvalidState(_)));
        assert_eq!(f.payments.applied_updates(), 0);
    }
}

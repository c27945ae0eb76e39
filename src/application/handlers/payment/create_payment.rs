//! CreatePaymentHandler - Command handler for charging an order.
//!
//! The attempt is persisted as `Processing` before the gateway is called, so
//! a crash or a dropped request mid-charge still leaves a record that can be
//! reconciled later.

use std::sync::Arc;

use tracing::{Instrument, Span};

use crate::domain::foundation::{OrderId, Timestamp, UserId};
use crate::domain::payment::{
    Payment, PaymentError, PaymentMethod, PaymentOutcome, PaymentProvider, PaymentStatus,
    ReferenceNumber,
};
use crate::ports::{
    ChargeRequest, GatewayRegistry, OrderRepository, PayerIdentification, PaymentRepository,
};

use super::PaymentTransitions;

/// Command to pay an order.
#[derive(Debug, Clone)]
pub struct CreatePaymentCommand {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub provider: PaymentProvider,
    /// Tokenized payment method from the provider's client library.
    pub token: String,
    pub method: PaymentMethod,
    pub email: String,
    pub description: Option<String>,
    pub installments: Option<u32>,
    pub payment_method_id: Option<String>,
    pub identification: Option<PayerIdentification>,
    pub return_url: Option<String>,
}

/// Handler for creating payments.
pub struct CreatePaymentHandler {
    orders: Arc<dyn OrderRepository>,
    payments: Arc<dyn PaymentRepository>,
    gateways: GatewayRegistry,
    transitions: PaymentTransitions,
    span: Span,
}

impl CreatePaymentHandler {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        payments: Arc<dyn PaymentRepository>,
        gateways: GatewayRegistry,
        transitions: PaymentTransitions,
    ) -> Self {
        Self {
            orders,
            payments,
            gateways,
            transitions,
            span: tracing::info_span!("create_payment"),
        }
    }

    /// Replaces the span the handler records under.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Charges the order and returns the persisted payment.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the order does not exist or belongs to someone else
    /// - `InvalidState` if the order is not pending or confirmed
    /// - `Conflict` if the order already has a completed payment
    /// - `Gateway` if the charge was declined or the gateway failed; the
    ///   attempt is stored as failed first
    pub async fn handle(&self, cmd: CreatePaymentCommand) -> Result<Payment, PaymentError> {
        let span = tracing::info_span!(
            parent: &self.span,
            "charge",
            order_id = %cmd.order_id,
            provider = %cmd.provider
        );
        self.create(cmd).instrument(span).await
    }

    async fn create(&self, cmd: CreatePaymentCommand) -> Result<Payment, PaymentError> {
        if cmd.token.trim().is_empty() {
            return Err(PaymentError::validation("token", "Payment token is required"));
        }
        if cmd.email.trim().is_empty() {
            return Err(PaymentError::validation("email", "Payer email is required"));
        }

        // 1. The order must exist and belong to the caller
        let order = self
            .orders
            .find_for_owner(&cmd.order_id, &cmd.user_id)
            .await?
            .ok_or_else(|| PaymentError::order_not_found(cmd.order_id))?;

        // 2. Only pending or confirmed orders can be paid
        if !order.status.is_payable() {
            return Err(PaymentError::invalid_state(format!(
                "Order {} cannot be paid in status {}",
                order.order_number, order.status
            )));
        }

        // 3. Double-payment guard
        if self.payments.has_completed_for_order(&order.id).await? {
            return Err(PaymentError::conflict(format!(
                "Order {} already has a completed payment",
                order.order_number
            )));
        }

        let gateway = self.gateways.get(cmd.provider)?;
        let amount = order.total_money()?;

        // 4. Persist the attempt before any money moves
        let now = Timestamp::now();
        let sequence = self.payments.next_reference_sequence().await?;
        let payment = Payment::start(
            ReferenceNumber::generate(&now, sequence),
            cmd.user_id.clone(),
            order.id,
            cmd.provider,
            cmd.method,
            amount.clone(),
            Some(cmd.email.clone()),
            now,
        );
        self.payments.save(&payment).await?;
        tracing::info!(
            payment_id = %payment.id,
            reference = %payment.reference_number,
            amount = %amount,
            "Payment attempt created"
        );

        // 5. Charge
        let request = ChargeRequest {
            amount,
            token: cmd.token,
            method: cmd.method,
            email: cmd.email,
            description: cmd
                .description
                .unwrap_or_else(|| format!("Order {}", order.order_number)),
            reference: payment.reference_number.to_string(),
            order_id: order.id,
            installments: cmd.installments,
            payment_method_id: cmd.payment_method_id,
            identification: cmd.identification,
            return_url: cmd.return_url,
        };

        let charge = match gateway.charge(request).await {
            Ok(charge) => charge,
            Err(e) => {
                tracing::warn!(
                    payment_id = %payment.id,
                    code = %e.code,
                    error = %e.message,
                    "Charge rejected by gateway"
                );
                let failure = PaymentError::from(e);
                return Err(self
                    .record_failure(payment, PaymentOutcome::default(), failure)
                    .await);
            }
        };

        let target = gateway.classify(&charge.status);
        let outcome = PaymentOutcome {
            external_id: Some(charge.external_id),
            card_mask: charge.card_mask,
            card_brand: charge.card_brand,
            provider_response: Some(charge.raw),
            error_message: (target == PaymentStatus::Failed)
                .then(|| format!("Payment failed with status: {}", charge.status)),
        };

        let applied = match self
            .transitions
            .apply(payment.clone(), target, outcome.clone(), Timestamp::now())
            .await
        {
            Ok(applied) => applied,
            Err(e) => {
                tracing::error!(
                    payment_id = %payment.id,
                    external_id = ?outcome.external_id,
                    gateway_status = %charge.status,
                    error = %e,
                    "Gateway accepted the charge but recording it failed"
                );
                return Err(self.record_failure(payment, outcome, e).await);
            }
        };

        if applied.payment.status == PaymentStatus::Failed {
            return Err(PaymentError::gateway(
                cmd.provider,
                applied
                    .payment
                    .error_message
                    .unwrap_or_else(|| "Payment failed".to_string()),
            ));
        }

        // 6. Return the stored copy
        let stored = self
            .payments
            .find_by_id(&applied.payment.id)
            .await?
            .unwrap_or(applied.payment);
        Ok(stored)
    }

    /// Stores the attempt as failed and hands back the error to surface.
    ///
    /// Whatever the gateway already reported is kept on the record so an
    /// accepted charge stays traceable for a manual refund.
    async fn record_failure(
        &self,
        payment: Payment,
        mut outcome: PaymentOutcome,
        failure: PaymentError,
    ) -> PaymentError {
        let reason = match &failure {
            PaymentError::Gateway { message, .. } => message.clone(),
            other => other.message(),
        };
        outcome.error_message = Some(reason.clone());
        let carries_gateway_id = outcome.external_id.is_some();

        let mut stored = self
            .transitions
            .apply(payment.clone(), PaymentStatus::Failed, outcome, Timestamp::now())
            .await;
        if stored.is_err() && carries_gateway_id {
            // The gateway id itself may be what the store refuses
            stored = self
                .transitions
                .apply(
                    payment.clone(),
                    PaymentStatus::Failed,
                    PaymentOutcome::with_error(reason),
                    Timestamp::now(),
                )
                .await;
        }
        if let Err(e) = stored {
            tracing::error!(
                payment_id = %payment.id,
                error = %e,
                "Could not store failed payment attempt"
            );
        }
        failure
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::adapters::gateways::{MockPaymentGateway, MOCK_APPROVED, MOCK_PENDING};
    use crate::adapters::memory::{InMemoryOrderRepository, InMemoryPaymentRepository};
    use crate::adapters::notification::RecordingNotifier;
    use crate::application::handlers::payment::NotificationDispatcher;
    use crate::domain::foundation::Money;
    use crate::domain::order::{Order, OrderStatus};
    use crate::ports::GatewayError;
    use rust_decimal_macros::dec;

    struct Fixture {
        orders: Arc<InMemoryOrderRepository>,
        payments: Arc<InMemoryPaymentRepository>,
        gateway: MockPaymentGateway,
        handler: CreatePaymentHandler,
        order: Order,
    }

    fn fixture() -> Fixture {
        let orders = Arc::new(InMemoryOrderRepository::new());
        let payments = Arc::new(InMemoryPaymentRepository::new());
        let gateway = MockPaymentGateway::new(PaymentProvider::Culqi);
        let order = Order::new(UserId::new("user-1").unwrap(), "ORD-1", dec!(118.00), "PEN");
        orders.insert(order.clone());

        let transitions = PaymentTransitions::new(
            payments.clone(),
            orders.clone(),
            NotificationDispatcher::new(Arc::new(RecordingNotifier::new())),
        );
        let handler = CreatePaymentHandler::new(
            orders.clone(),
            payments.clone(),
            GatewayRegistry::new().register(Arc::new(gateway.clone())),
            transitions,
        );

        Fixture {
            orders,
            payments,
            gateway,
            handler,
            order,
        }
    }

    fn command(order_id: OrderId, user: &str) -> CreatePaymentCommand {
        CreatePaymentCommand {
            order_id,
            user_id: UserId::new(user).unwrap(),
            provider: PaymentProvider::Culqi,
            token: "tkn_test_123".to_string(),
            method: PaymentMethod::Card,
            email: "buyer@example.com".to_string(),
            description: None,
            installments: None,
            payment_method_id: None,
            identification: None,
            return_url: None,
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Success Cases
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn approved_charge_completes_payment_and_pays_order() {
        let f = fixture();

        let payment = f.handler.handle(command(f.order.id, "user-1")).await.unwrap();

        assert_eq!(payment.status, PaymentStatus::Completed);
        assert!(payment.paid_at.is_some());
        assert_eq!(payment.amount, dec!(118.00));
        assert!(payment.reference_number.as_str().starts_with("PAY-"));
        assert_eq!(f.orders.get(&f.order.id).unwrap().status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn charge_is_sent_in_order_currency_with_reference() {
        let f = fixture();

        let payment = f.handler.handle(command(f.order.id, "user-1")).await.unwrap();

        let sent = &f.gateway.charge_requests()[0];
        assert_eq!(sent.amount.to_minor_units().unwrap(), 11800);
        assert_eq!(sent.reference, payment.reference_number.as_str());
        assert_eq!(sent.description, "Order ORD-1");
    }

    #[tokio::test]
    async fn deferred_charge_leaves_payment_pending_and_order_unpaid() {
        let f = fixture();
        f.gateway.queue_charge_status("ch_pending", MOCK_PENDING);

        let payment = f.handler.handle(command(f.order.id, "user-1")).await.unwrap();

        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.external_id.as_deref(), Some("ch_pending"));
        assert_eq!(f.orders.get(&f.order.id).unwrap().status, OrderStatus::Pending);
    }

    // ══════════════════════════════════════════════════════════════
    // Failure Cases
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn decline_is_stored_as_failed_and_surfaced() {
        let f = fixture();
        f.gateway.decline_next_charge("Insufficient funds");

        let err = f.handler.handle(command(f.order.id, "user-1")).await.unwrap_err();

        assert_eq!(err.message(), "Payment failed: Insufficient funds");
        let stored = &f.payments.all()[0];
        assert_eq!(stored.status, PaymentStatus::Failed);
        assert_eq!(stored.error_message.as_deref(), Some("Insufficient funds"));
        assert_eq!(f.orders.get(&f.order.id).unwrap().status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn transport_failure_is_a_gateway_error() {
        let f = fixture();
        f.gateway.set_method_error(
            "charge",
            GatewayError::provider_error(PaymentProvider::Culqi, "HTTP 503"),
        );

        let err = f.handler.handle(command(f.order.id, "user-1")).await.unwrap_err();

        assert!(matches!(err, PaymentError::Gateway { .. }));
        assert_eq!(f.payments.all()[0].status, PaymentStatus::Failed);
    }

    #[tokio::test]
    async fn accepted_charge_losing_to_concurrent_completion_keeps_gateway_facts() {
        let f = fixture();
        f.gateway.queue_charge_status("ch_captured", MOCK_APPROVED);
        f.gateway.set_charge_delay(Duration::from_millis(50));

        let now = Timestamp::now();
        let mut competing = Payment::start(
            ReferenceNumber::generate(&now, 900),
            UserId::new("user-1").unwrap(),
            f.order.id,
            PaymentProvider::Culqi,
            PaymentMethod::Card,
            Money::new(dec!(118.00), "PEN").unwrap(),
            None,
            now,
        );
        competing.status = PaymentStatus::Completed;
        competing.external_id = Some("ch_other".to_string());
        competing.paid_at = Some(now);

        let (result, _) = tokio::join!(f.handler.handle(command(f.order.id, "user-1")), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            f.payments.insert(competing.clone());
        });

        let err = result.unwrap_err();
        assert!(matches!(err, PaymentError::Conflict(_)));

        let attempt = f
            .payments
            .all()
            .into_iter()
            .find(|p| p.id != competing.id)
            .unwrap();
        assert_eq!(attempt.status, PaymentStatus::Failed);
        assert_eq!(attempt.external_id.as_deref(), Some("ch_captured"));
        assert_eq!(attempt.card_mask.as_deref(), Some("****4242"));
        assert_eq!(
            attempt.provider_response.as_ref().and_then(|r| r.get("id")),
            Some(&serde_json::json!("ch_captured"))
        );
        assert!(attempt.error_message.is_some());
    }

    #[tokio::test]
    async fn reused_gateway_id_still_stores_the_attempt_as_failed() {
        let f = fixture();
        let now = Timestamp::now();
        let mut earlier = Payment::start(
            ReferenceNumber::generate(&now, 901),
            UserId::new("user-1").unwrap(),
            f.order.id,
            PaymentProvider::Culqi,
            PaymentMethod::Card,
            Money::new(dec!(118.00), "PEN").unwrap(),
            None,
            now,
        );
        earlier.status = PaymentStatus::Failed;
        earlier.external_id = Some("ch_reused".to_string());
        f.payments.insert(earlier.clone());
        f.gateway.queue_charge_status("ch_reused", MOCK_APPROVED);

        let err = f.handler.handle(command(f.order.id, "user-1")).await.unwrap_err();

        assert!(matches!(err, PaymentError::Conflict(_)));
        let attempt = f
            .payments
            .all()
            .into_iter()
            .find(|p| p.id != earlier.id)
            .unwrap();
        assert_eq!(attempt.status, PaymentStatus::Failed);
        assert_eq!(attempt.external_id, None);
        assert!(attempt.error_message.is_some());
    }

    #[tokio::test]
    async fn other_users_order_is_not_found() {
        let f = fixture();

        let err = f.handler.handle(command(f.order.id, "user-2")).await.unwrap_err();

        assert!(matches!(err, PaymentError::NotFound { resource: "Order", .. }));
        assert!(!f.gateway.was_called("charge"));
    }

    #[tokio::test]
    async fn cancelled_order_is_invalid_state() {
        let f = fixture();
        f.orders
            .transition_status(&f.order.id, OrderStatus::Cancelled, Timestamp::now())
            .await
            .unwrap();

        let err = f.handler.handle(command(f.order.id, "user-1")).await.unwrap_err();

        assert!(matches!(err, PaymentError::InvalidState(_)));
        assert!(f.payments.all().is_empty());
    }

    #[tokio::test]
    async fn unconfigured_provider_is_rejected_before_recording() {
        let f = fixture();
        let mut cmd = command(f.order.id, "user-1");
        cmd.provider = PaymentProvider::Stripe;

        let err = f.handler.handle(cmd).await.unwrap_err();

        assert!(matches!(err, PaymentError::ValidationFailed { .. }));
        assert!(f.payments.all().is_empty());
    }

    #[tokio::test]
    async fn blank_token_is_rejected() {
        let f = fixture();
        let mut cmd = command(f.order.id, "user-1");
        cmd.token = "  ".to_string();

        let err = f.handler.handle(cmd).await.unwrap_err();
        assert!(matches!(err, PaymentError::ValidationFailed { .. }));
    }
}

//! RefundPaymentHandler - Command handler for refunding a completed payment.
//!
//! Refunds always go back through the gateway that took the charge. One
//! refund per payment is in flight at a time, and every call for a payment
//! carries the same idempotency key.

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{Instrument, Span};

use crate::domain::foundation::{Money, PaymentId, Timestamp};
use crate::domain::payment::{Payment, PaymentError, PaymentOutcome, PaymentStatus};
use crate::ports::{GatewayRegistry, PaymentRepository, RefundRequest};

use super::PaymentTransitions;

/// Smallest refundable amount in major units.
const MIN_REFUND: Decimal = dec!(0.01);

/// Command to refund a payment, fully or partially.
#[derive(Debug, Clone)]
pub struct RefundPaymentCommand {
    pub payment_id: PaymentId,
    /// Defaults to the whole payment.
    pub amount: Option<Decimal>,
    pub reason: Option<String>,
}

/// Handler for refunds.
pub struct RefundPaymentHandler {
    payments: Arc<dyn PaymentRepository>,
    gateways: GatewayRegistry,
    transitions: PaymentTransitions,
    span: Span,
}

impl RefundPaymentHandler {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        gateways: GatewayRegistry,
        transitions: PaymentTransitions,
    ) -> Self {
        Self {
            payments,
            gateways,
            transitions,
            span: tracing::info_span!("refund_payment"),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Refunds the payment and returns it in `Refunded`.
    ///
    /// # Errors
    ///
    /// - `Conflict` if a refund of the same payment is already in flight
    /// - `NotFound` if the payment does not exist
    /// - `InvalidState` unless the payment is completed with a gateway id;
    ///   checked before any gateway call
    /// - `ValidationFailed` for an amount outside `0.01..=amount`
    /// - `Gateway` if the gateway rejects the refund
    pub async fn handle(&self, cmd: RefundPaymentCommand) -> Result<Payment, PaymentError> {
        let span = tracing::info_span!(parent: &self.span, "refund", payment_id = %cmd.payment_id);
        self.refund(cmd).instrument(span).await
    }

    async fn refund(&self, cmd: RefundPaymentCommand) -> Result<Payment, PaymentError> {
        // Held until the outcome is stored; the read below sees any refund
        // that finished before us.
        let _claim = self.transitions.claim_refund(cmd.payment_id)?;

        let payment = self
            .payments
            .find_by_id(&cmd.payment_id)
            .await?
            .ok_or_else(|| PaymentError::payment_not_found(cmd.payment_id))?;

        let external_id = payment.ensure_refundable()?.to_string();

        let amount = match cmd.amount {
            Some(requested) => validate_amount(requested, payment.amount)?,
            None => payment.amount,
        };
        let money = Money::new(amount, &payment.currency)?;
        let gateway = self.gateways.get(payment.provider)?;

        let result = gateway
            .refund(RefundRequest {
                external_id,
                amount: money,
                full: amount == payment.amount,
                reason: cmd.reason.clone(),
                idempotency_key: refund_idempotency_key(&payment.id),
            })
            .await
            .map_err(|e| {
                tracing::warn!(
                    payment_id = %payment.id,
                    code = %e.code,
                    error = %e.message,
                    "Refund rejected by gateway"
                );
                PaymentError::from(e)
            })?;

        tracing::info!(
            payment_id = %payment.id,
            refund_id = %result.refund_id,
            amount = %amount,
            "Refund accepted by gateway"
        );

        let applied = self
            .transitions
            .apply(
                payment,
                PaymentStatus::Refunded,
                PaymentOutcome::default(),
                Timestamp::now(),
            )
            .await?;

        Ok(applied.payment)
    }
}

/// Same key for every refund call of a payment.
fn refund_idempotency_key(payment_id: &PaymentId) -> String {
    format!("refund-{}", payment_id)
}

fn validate_amount(requested: Decimal, paid: Decimal) -> Result<Decimal, PaymentError> {
    if requested < MIN_REFUND || requested > paid {
        return Err(PaymentError::validation(
            "amount",
            format!("Refund amount must be between {} and {}", MIN_REFUND, paid),
        ));
    }
    Ok(requested)
}

//! Payment aggregate.
//!
//! A payment is an append-only financial record of one charge attempt. The
//! synchronous charge path and the webhook path both mutate it exclusively
//! through [`Payment::apply`], so they cannot disagree on which transitions
//! are legal.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    DomainError, ErrorCode, Money, OrderId, PaymentId, StateMachine, Timestamp, UserId,
    ValidationError,
};

use super::{PaymentMethod, PaymentProvider, PaymentStatus, ReferenceNumber};

/// Message stored when a failure arrives without a reason.
const DEFAULT_FAILURE_MESSAGE: &str = "Payment failed";

/// One payment attempt against an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub reference_number: ReferenceNumber,
    pub user_id: UserId,
    pub order_id: OrderId,
    pub status: PaymentStatus,
    pub provider: PaymentProvider,
    pub method: PaymentMethod,
    /// Copied from the order at creation and never changed.
    pub amount: Decimal,
    pub currency: String,
    /// Gateway transaction id. Written once.
    pub external_id: Option<String>,
    pub card_mask: Option<String>,
    pub card_brand: Option<String>,
    /// Verbatim gateway response, for audit and disputes.
    pub provider_response: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub payer_email: Option<String>,
    pub paid_at: Option<Timestamp>,
    pub refunded_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Gateway-reported facts to fold into a payment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentOutcome {
    pub external_id: Option<String>,
    pub card_mask: Option<String>,
    pub card_brand: Option<String>,
    pub provider_response: Option<serde_json::Value>,
    pub error_message: Option<String>,
}

impl PaymentOutcome {
    pub fn with_error(message: impl Into<String>) -> Self {
        Self {
            error_message: Some(message.into()),
            ..Default::default()
        }
    }
}

/// What [`Payment::apply`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Status changed from the given state.
    Applied { from: PaymentStatus },
    /// The payment is already in the target status.
    AlreadyApplied,
    /// The payment is settled and absorbs this outcome silently.
    Absorbed { current: PaymentStatus },
}

impl Transition {
    pub fn changed(&self) -> bool {
        matches!(self, Transition::Applied { .. })
    }
}

impl Payment {
    /// Starts a new attempt in `Processing`.
    #[allow(clippy::too_many_arguments)]
    pub fn start(
        reference_number: ReferenceNumber,
        user_id: UserId,
        order_id: OrderId,
        provider: PaymentProvider,
        method: PaymentMethod,
        amount: Money,
        payer_email: Option<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: PaymentId::new(),
            reference_number,
            user_id,
            order_id,
            status: PaymentStatus::Processing,
            provider,
            method,
            amount: amount.amount(),
            currency: amount.currency().to_string(),
            external_id: None,
            card_mask: None,
            card_brand: None,
            provider_response: None,
            error_message: None,
            payer_email,
            paid_at: None,
            refunded_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn money(&self) -> Result<Money, ValidationError> {
        Money::new(self.amount, &self.currency)
    }

    /// External id, if the gateway has assigned one and it is not blank.
    pub fn external_id(&self) -> Option<&str> {
        self.external_id.as_deref().filter(|id| !id.trim().is_empty())
    }

    /// Checks the refund precondition: completed and correlated with the gateway.
    pub fn ensure_refundable(&self) -> Result<&str, DomainError> {
        if self.status != PaymentStatus::Completed {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Only completed payments can be refunded; payment {} is {}",
                    self.reference_number, self.status
                ),
            ));
        }
        self.external_id().ok_or_else(|| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Payment {} has no gateway transaction id to refund",
                    self.reference_number
                ),
            )
        })
    }

    /// Moves the payment towards `target`, folding in the gateway facts.
    ///
    /// Settled payments absorb outcomes idempotently: anything other than a
    /// refund applied to `Completed`, and anything applied to `Refunded`, is a
    /// no-op. A failed attempt never changes again.
    pub fn apply(
        &mut self,
        target: PaymentStatus,
        outcome: PaymentOutcome,
        at: Timestamp,
    ) -> Result<Transition, DomainError> {
        if self.status == target {
            return Ok(Transition::AlreadyApplied);
        }
        match (self.status, target) {
            (PaymentStatus::Completed, t) if t != PaymentStatus::Refunded => {
                return Ok(Transition::Absorbed { current: self.status });
            }
            (PaymentStatus::Refunded, _) => {
                return Ok(Transition::Absorbed { current: self.status });
            }
            _ => {}
        }

        let next = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition payment {} from {} to {}",
                    self.reference_number, self.status, target
                ),
            )
        })?;

        if let (Some(current), Some(incoming)) = (self.external_id(), outcome.external_id.as_deref())
        {
            if current != incoming {
                return Err(DomainError::new(
                    ErrorCode::DuplicateExternalId,
                    format!(
                        "Payment {} is already bound to transaction {}",
                        self.reference_number, current
                    ),
                ));
            }
        }

        let from = self.status;
        self.status = next;
        if self.external_id().is_none() {
            if let Some(external_id) = outcome.external_id.filter(|id| !id.trim().is_empty()) {
                self.external_id = Some(external_id);
            }
        }
        if outcome.card_mask.is_some() {
            self.card_mask = outcome.card_mask;
        }
        if outcome.card_brand.is_some() {
            self.card_brand = outcome.card_brand;
        }
        if outcome.provider_response.is_some() {
            self.provider_response = outcome.provider_response;
        }

        match next {
            PaymentStatus::Completed => {
                self.paid_at.get_or_insert(at);
                self.error_message = None;
            }
            PaymentStatus::Refunded => {
                self.refunded_at.get_or_insert(at);
            }
            PaymentStatus::Failed => {
                self.error_message = Some(
                    outcome
                        .error_message
                        .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string()),
                );
            }
            PaymentStatus::Pending | PaymentStatus::Processing => {}
        }
        self.updated_at = at;

        Ok(Transition::Applied { from })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn processing_payment() -> Payment {
        let now = Timestamp::now();
        Payment::start(
            ReferenceNumber::generate(&now, 1),
            UserId::new("user-1").unwrap(),
            OrderId::new(),
            PaymentProvider::Culqi,
            PaymentMethod::Card,
            Money::new(dec!(118.00), "PEN").unwrap(),
            Some("buyer@example.com".to_string()),
            now,
        )
    }

    fn charged(external_id: &str) -> PaymentOutcome {
        PaymentOutcome {
            external_id: Some(external_id.to_string()),
            card_mask: Some("411111******1111".to_string()),
            card_brand: Some("Visa".to_string()),
            provider_response: Some(serde_json::json!({"id": external_id})),
            error_message: None,
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Creation
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn start_creates_processing_payment_with_order_amount() {
        let payment = processing_payment();

        assert_eq!(payment.status, PaymentStatus::Processing);
        assert_eq!(payment.amount, dec!(118.00));
        assert_eq!(payment.currency, "PEN");
        assert!(payment.external_id.is_none());
        assert!(payment.paid_at.is_none());
    }

    // ══════════════════════════════════════════════════════════════
    // Completion
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn completing_sets_fields_and_paid_at() {
        let mut payment = processing_payment();
        let at = Timestamp::now();

        let transition = payment
            .apply(PaymentStatus::Completed, charged("chr_1"), at)
            .unwrap();

        assert_eq!(transition, Transition::Applied { from: PaymentStatus::Processing });
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(payment.external_id.as_deref(), Some("chr_1"));
        assert_eq!(payment.card_brand.as_deref(), Some("Visa"));
        assert_eq!(payment.paid_at, Some(at));
    }

    #[test]
    fn completing_twice_is_a_noop_that_keeps_paid_at() {
        let mut payment = processing_payment();
        let first = Timestamp::now();
        payment.apply(PaymentStatus::Completed, charged("chr_1"), first).unwrap();

        let again = payment
            .apply(PaymentStatus::Completed, charged("chr_1"), Timestamp::now())
            .unwrap();

        assert_eq!(again, Transition::AlreadyApplied);
        assert_eq!(payment.paid_at, Some(first));
    }

    #[test]
    fn failure_after_completion_is_absorbed() {
        let mut payment = processing_payment();
        payment.apply(PaymentStatus::Completed, charged("chr_1"), Timestamp::now()).unwrap();

        let transition = payment
            .apply(PaymentStatus::Failed, PaymentOutcome::with_error("late"), Timestamp::now())
            .unwrap();

        assert_eq!(transition, Transition::Absorbed { current: PaymentStatus::Completed });
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert!(payment.error_message.is_none());
    }

    // ══════════════════════════════════════════════════════════════
    // Failure
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn failing_records_error_message() {
        let mut payment = processing_payment();

        payment
            .apply(
                PaymentStatus::Failed,
                PaymentOutcome::with_error("Insufficient funds"),
                Timestamp::now(),
            )
            .unwrap();

        assert_eq!(payment.status, PaymentStatus::Failed);
        assert_eq!(payment.error_message.as_deref(), Some("Insufficient funds"));
    }

    #[test]
    fn failing_without_reason_uses_default_message() {
        let mut payment = processing_payment();

        payment
            .apply(PaymentStatus::Failed, PaymentOutcome::default(), Timestamp::now())
            .unwrap();

        assert_eq!(payment.error_message.as_deref(), Some(DEFAULT_FAILURE_MESSAGE));
    }

    #[test]
    fn failed_payment_cannot_complete() {
        let mut payment = processing_payment();
        payment.apply(PaymentStatus::Failed, PaymentOutcome::default(), Timestamp::now()).unwrap();

        let err = payment
            .apply(PaymentStatus::Completed, charged("chr_1"), Timestamp::now())
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
        assert_eq!(payment.status, PaymentStatus::Failed);
    }

    // ══════════════════════════════════════════════════════════════
    // External Id
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn external_id_is_write_once() {
        let mut payment = processing_payment();
        payment.apply(PaymentStatus::Pending, charged("chr_1"), Timestamp::now()).unwrap();

        let err = payment
            .apply(PaymentStatus::Completed, charged("chr_2"), Timestamp::now())
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::DuplicateExternalId);
        assert_eq!(payment.external_id.as_deref(), Some("chr_1"));
        assert_eq!(payment.status, PaymentStatus::Pending);
    }

    #[test]
    fn blank_external_id_is_not_stored() {
        let mut payment = processing_payment();
        payment
            .apply(
                PaymentStatus::Pending,
                PaymentOutcome {
                    external_id: Some("  ".to_string()),
                    ..Default::default()
                },
                Timestamp::now(),
            )
            .unwrap();

        assert!(payment.external_id().is_none());
    }

    // ══════════════════════════════════════════════════════════════
    // Refund
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn refund_requires_completed_status() {
        let payment = processing_payment();
        let err = payment.ensure_refundable().unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
    }

    #[test]
    fn refund_requires_external_id() {
        let mut payment = processing_payment();
        payment.status = PaymentStatus::Completed;

        assert!(payment.ensure_refundable().is_err());
    }

    #[test]
    fn refunding_sets_refunded_at_once() {
        let mut payment = processing_payment();
        payment.apply(PaymentStatus::Completed, charged("chr_1"), Timestamp::now()).unwrap();
        assert_eq!(payment.ensure_refundable().unwrap(), "chr_1");

        let at = Timestamp::now();
        payment.apply(PaymentStatus::Refunded, PaymentOutcome::default(), at).unwrap();
        let again = payment
            .apply(PaymentStatus::Refunded, PaymentOutcome::default(), Timestamp::now())
            .unwrap();

        assert_eq!(payment.status, PaymentStatus::Refunded);
        assert_eq!(payment.refunded_at, Some(at));
        assert_eq!(again, Transition::AlreadyApplied);
    }

    #[test]
    fn refunded_payment_absorbs_success() {
        let mut payment = processing_payment();
        payment.apply(PaymentStatus::Completed, charged("chr_1"), Timestamp::now()).unwrap();
        payment.apply(PaymentStatus::Refunded, PaymentOutcome::default(), Timestamp::now()).unwrap();

        let transition = payment
            .apply(PaymentStatus::Completed, PaymentOutcome::default(), Timestamp::now())
            .unwrap();

        assert!(!transition.changed());
        assert_eq!(payment.status, PaymentStatus::Refunded);
    }

    #[test]
    fn processing_payment_cannot_be_refunded_directly() {
        let mut payment = processing_payment();
        assert!(payment
            .apply(PaymentStatus::Refunded, PaymentOutcome::default(), Timestamp::now())
            .is_err());
    }
}

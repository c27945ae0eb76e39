//! PaymentTransitions - the one write path for payment status changes.
//!
//! The charge, refund, webhook and sync handlers all move payments through
//! here. A transition is folded in with `Payment::apply`, then written with a
//! conditional update on the status it was read in. Only the caller whose
//! update lands runs the follow-up effects (order edge, notification), so
//! concurrent deliveries of the same outcome apply once.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use crate::domain::foundation::{PaymentId, Timestamp};
use crate::domain::order::OrderStatus;
use crate::domain::payment::{Payment, PaymentError, PaymentOutcome, PaymentStatus, Transition};
use crate::ports::{NotificationKind, OrderRepository, PaymentNotification, PaymentRepository};

use super::NotificationDispatcher;

/// Attempts before giving up on a payment that keeps changing underneath us.
const MAX_ATTEMPTS: usize = 3;

/// Result of driving a payment towards a status.
#[derive(Debug, Clone)]
pub struct AppliedTransition {
    /// The payment as persisted after the attempt.
    pub payment: Payment,
    pub transition: Transition,
}

/// Shared transition service.
#[derive(Clone)]
pub struct PaymentTransitions {
    payments: Arc<dyn PaymentRepository>,
    orders: Arc<dyn OrderRepository>,
    notifications: NotificationDispatcher,
    /// Payments with a refund call outstanding in this process.
    refunds_in_flight: Arc<Mutex<HashSet<PaymentId>>>,
}

/// Exclusive right to refund one payment; released on drop.
#[derive(Debug)]
pub struct RefundClaim {
    payment_id: PaymentId,
    in_flight: Arc<Mutex<HashSet<PaymentId>>>,
}

impl Drop for RefundClaim {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.payment_id);
    }
}

impl PaymentTransitions {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        orders: Arc<dyn OrderRepository>,
        notifications: NotificationDispatcher,
    ) -> Self {
        Self {
            payments,
            orders,
            notifications,
            refunds_in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Claims the refund of `payment_id` until the returned guard drops.
    ///
    /// Clones of this service share the claims, so a duplicate request
    /// handled concurrently is refused before it reaches the gateway.
    ///
    /// # Errors
    ///
    /// - `Conflict` if a refund of the payment is already in flight
    pub fn claim_refund(&self, payment_id: PaymentId) -> Result<RefundClaim, PaymentError> {
        let claimed = self
            .refunds_in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(payment_id);
        if !claimed {
            return Err(PaymentError::conflict(format!(
                "A refund of payment {} is already in progress",
                payment_id
            )));
        }
        Ok(RefundClaim {
            payment_id,
            in_flight: self.refunds_in_flight.clone(),
        })
    }

    /// Drives `payment` to `target`, re-reading it whenever another writer
    /// got there first.
    ///
    /// # Errors
    ///
    /// - `InvalidState` if the stored status cannot reach `target`
    /// - `Conflict` if the write would break a uniqueness rule
    /// - `Internal` on storage failures
    pub async fn apply(
        &self,
        mut payment: Payment,
        target: PaymentStatus,
        outcome: PaymentOutcome,
        at: Timestamp,
    ) -> Result<AppliedTransition, PaymentError> {
        for attempt in 1..=MAX_ATTEMPTS {
            let expected = payment.status;
            let transition = payment.apply(target, outcome.clone(), at)?;

            if !transition.changed() {
                tracing::debug!(
                    payment_id = %payment.id,
                    status = %payment.status,
                    target = %target,
                    "Payment transition is a no-op"
                );
                return Ok(AppliedTransition {
                    payment,
                    transition,
                });
            }

            if self.payments.update_if_status(&payment, expected).await? {
                tracing::info!(
                    payment_id = %payment.id,
                    reference = %payment.reference_number,
                    from = %expected,
                    to = %payment.status,
                    "Payment status changed"
                );
                self.after_commit(&payment, at).await;
                return Ok(AppliedTransition {
                    payment,
                    transition,
                });
            }

            tracing::debug!(
                payment_id = %payment.id,
                attempt,
                "Payment changed concurrently, re-reading"
            );
            payment = self
                .payments
                .find_by_id(&payment.id)
                .await?
                .ok_or_else(|| PaymentError::payment_not_found(payment.id))?;
        }

        Err(PaymentError::internal(format!(
            "Payment {} kept changing while moving to {}",
            payment.reference_number, target
        )))
    }

    /// Follow-up effects, run only by the writer whose update landed.
    async fn after_commit(&self, payment: &Payment, at: Timestamp) {
        let (order_target, kind) = match payment.status {
            PaymentStatus::Completed => (Some(OrderStatus::Paid), Some(NotificationKind::Succeeded)),
            PaymentStatus::Refunded => {
                (Some(OrderStatus::Refunded), Some(NotificationKind::Refunded))
            }
            PaymentStatus::Failed => (None, Some(NotificationKind::Failed)),
            PaymentStatus::Pending | PaymentStatus::Processing => (None, None),
        };

        if let Some(target) = order_target {
            // The money already moved; an order that refuses the edge is an
            // anomaly for operators, not a reason to undo the payment.
            if let Err(e) = self
                .orders
                .transition_status(&payment.order_id, target, at)
                .await
            {
                tracing::warn!(
                    payment_id = %payment.id,
                    order_id = %payment.order_id,
                    target = %target,
                    error = %e,
                    "Order status update failed after payment transition"
                );
            }
        }

        if let Some(kind) = kind {
            self.notifications
                .dispatch(PaymentNotification::for_payment(kind, payment));
        }
    }
}

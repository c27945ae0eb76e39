//! Order as seen by the payment core.
//!
//! Payments read the owner, total and status and request two transitions.
//! Everything else about fulfilment belongs to the order module.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    DomainError, ErrorCode, Money, OrderId, StateMachine, Timestamp, UserId, ValidationError,
};

use super::OrderStatus;

/// A customer order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub order_number: String,
    pub total: Decimal,
    pub currency: String,
    pub status: OrderStatus,
    pub paid_at: Option<Timestamp>,
    pub shipped_at: Option<Timestamp>,
    pub delivered_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Order {
    /// Creates a new pending order.
    pub fn new(
        user_id: UserId,
        order_number: impl Into<String>,
        total: Decimal,
        currency: impl Into<String>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: OrderId::new(),
            user_id,
            order_number: order_number.into(),
            total,
            currency: currency.into(),
            status: OrderStatus::Pending,
            paid_at: None,
            shipped_at: None,
            delivered_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The amount a payment for this order must charge.
    pub fn total_money(&self) -> Result<Money, ValidationError> {
        Money::new(self.total, &self.currency)
    }

    /// Returns true if the order belongs to the given user.
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }

    /// Marks the order paid, stamping `paid_at`.
    pub fn mark_paid(&mut self, at: Timestamp) -> Result<(), DomainError> {
        self.transition_to(OrderStatus::Paid)?;
        self.paid_at = Some(at);
        self.updated_at = at;
        Ok(())
    }

    /// Marks the order refunded.
    pub fn mark_refunded(&mut self, at: Timestamp) -> Result<(), DomainError> {
        self.transition_to(OrderStatus::Refunded)?;
        self.updated_at = at;
        Ok(())
    }

    /// Applies a status change requested by the payment core.
    pub fn advance(&mut self, target: OrderStatus, at: Timestamp) -> Result<(), DomainError> {
        match target {
            OrderStatus::Paid => self.mark_paid(at),
            OrderStatus::Refunded => self.mark_refunded(at),
            other => {
                self.transition_to(other)?;
                self.updated_at = at;
                Ok(())
            }
        }
    }

    fn transition_to(&mut self, target: OrderStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition order {} from {} to {}",
                    self.order_number, self.status, target
                ),
            )
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_order() -> Order {
        Order::new(UserId::new("user-1").unwrap(), "ORD-20240101-0001", dec!(118.00), "PEN")
    }

    #[test]
    fn new_order_is_pending_and_unpaid() {
        let order = test_order();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.paid_at.is_none());
    }

    #[test]
    fn mark_paid_sets_status_and_paid_at() {
        let mut order = test_order();
        let at = Timestamp::now();

        order.mark_paid(at).unwrap();

        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.paid_at, Some(at));
    }

    #[test]
    fn mark_paid_rejects_cancelled_order() {
        let mut order = test_order();
        order.status = OrderStatus::Cancelled;

        let err = order.mark_paid(Timestamp::now()).unwrap_err();

        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert!(order.paid_at.is_none());
    }

    #[test]
    fn mark_refunded_from_paid() {
        let mut order = test_order();
        order.mark_paid(Timestamp::now()).unwrap();

        order.mark_refunded(Timestamp::now()).unwrap();

        assert_eq!(order.status, OrderStatus::Refunded);
    }

    #[test]
    fn advance_dispatches_to_paid_edge() {
        let mut order = test_order();
        order.status = OrderStatus::Confirmed;

        order.advance(OrderStatus::Paid, Timestamp::now()).unwrap();

        assert_eq!(order.status, OrderStatus::Paid);
        assert!(order.paid_at.is_some());
    }

    #[test]
    fn advance_rejects_refund_of_pending_order() {
        let mut order = test_order();
        assert!(order.advance(OrderStatus::Refunded, Timestamp::now()).is_err());
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[test]
    fn total_money_uses_order_currency() {
        let money = test_order().total_money().unwrap();
        assert_eq!(money.amount(), dec!(118.00));
        assert_eq!(money.currency(), "PEN");
    }

    #[test]
    fn ownership_check_compares_user_ids() {
        let order = test_order();
        assert!(order.is_owned_by(&UserId::new("user-1").unwrap()));
        assert!(!order.is_owned_by(&UserId::new("user-2").unwrap()));
    }
}

//! Query handlers for payment listings.

use std::sync::Arc;

use crate::domain::foundation::{AuthenticatedUser, OrderId, UserId};
use crate::domain::payment::{Payment, PaymentError};
use crate::ports::{OrderRepository, PaymentRepository};

/// Which payments to list.
#[derive(Debug, Clone)]
pub enum ListPaymentsQuery {
    /// The caller's own payments.
    Mine(UserId),
    /// Every payment (admin).
    All,
}

/// Handler for payment listings, newest first.
pub struct ListPaymentsHandler {
    payments: Arc<dyn PaymentRepository>,
}

impl ListPaymentsHandler {
    pub fn new(payments: Arc<dyn PaymentRepository>) -> Self {
        Self { payments }
    }

    pub async fn handle(&self, query: ListPaymentsQuery) -> Result<Vec<Payment>, PaymentError> {
        let payments = match query {
            ListPaymentsQuery::Mine(user_id) => self.payments.find_by_user(&user_id).await?,
            ListPaymentsQuery::All => self.payments.find_all().await?,
        };
        Ok(payments)
    }
}

/// Query for the payment attempts of one order.
#[derive(Debug, Clone)]
pub struct ListOrderPaymentsQuery {
    pub order_id: OrderId,
    pub requester: AuthenticatedUser,
}

/// Handler for an order's payment attempts.
///
/// Customers must own the order; admins see any order.
pub struct ListOrderPaymentsHandler {
    orders: Arc<dyn OrderRepository>,
    payments: Arc<dyn PaymentRepository>,
}

impl ListOrderPaymentsHandler {
    pub fn new(orders: Arc<dyn OrderRepository>, payments: Arc<dyn PaymentRepository>) -> Self {
        Self { orders, payments }
    }

    pub async fn handle(&self, query: ListOrderPaymentsQuery) -> Result<Vec<Payment>, PaymentError> {
        let order = if query.requester.is_admin() {
            self.orders.find_by_id(&query.order_id).await?
        } else {
            self.orders
                .find_for_owner(&query.order_id, &query.requester.id)
                .await?
        };
        let order = order.ok_or_else(|| PaymentError::order_not_found(query.order_id))?;

        Ok(self.payments.find_by_order(&order.id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryOrderRepository, InMemoryPaymentRepository};
    use crate::domain::foundation::{Money, Role, Timestamp};
    use crate::domain::order::Order;
    use crate::domain::payment::{PaymentMethod, PaymentProvider, ReferenceNumber};
    use rust_decimal_macros::dec;

    fn payment_for(order: &Order, sequence: u64) -> Payment {
        let now = Timestamp::now();
        Payment::start(
            ReferenceNumber::generate(&now, sequence),
            order.user_id.clone(),
            order.id,
            PaymentProvider::Culqi,
            PaymentMethod::Card,
            Money::new(order.total, &order.currency).unwrap(),
            None,
            now,
        )
    }

    #[tokio::test]
    async fn mine_only_lists_callers_payments() {
        let repo = Arc::new(InMemoryPaymentRepository::new());
        let mine = Order::new(UserId::new("user-1").unwrap(), "ORD-1", dec!(5), "PEN");
        let theirs = Order::new(UserId::new("user-2").unwrap(), "ORD-2", dec!(5), "PEN");
        repo.insert(payment_for(&mine, 1));
        repo.insert(payment_for(&theirs, 2));
        let handler = ListPaymentsHandler::new(repo);

        let listed = handler
            .handle(ListPaymentsQuery::Mine(UserId::new("user-1").unwrap()))
            .await
            .unwrap();
        let all = handler.handle(ListPaymentsQuery::All).await.unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn order_payments_require_ownership_unless_admin() {
        let orders = Arc::new(InMemoryOrderRepository::new());
        let payments = Arc::new(InMemoryPaymentRepository::new());
        let order = Order::new(UserId::new("user-1").unwrap(), "ORD-1", dec!(5), "PEN");
        orders.insert(order.clone());
        payments.insert(payment_for(&order, 1));
        payments.insert(payment_for(&order, 2));
        let handler = ListOrderPaymentsHandler::new(orders, payments);

        let stranger = AuthenticatedUser::new(UserId::new("user-2").unwrap(), None, vec![Role::User]);
        let admin = AuthenticatedUser::new(UserId::new("ops").unwrap(), None, vec![Role::Admin]);

        let err = handler
            .handle(ListOrderPaymentsQuery {
                order_id: order.id,
                requester: stranger,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::NotFound { resource: "Order", .. }));

        let attempts = handler
            .handle(ListOrderPaymentsQuery {
                order_id: order.id,
                requester: admin,
            })
            .await
            .unwrap();
        assert_eq!(attempts.len(), 2);
    }
}

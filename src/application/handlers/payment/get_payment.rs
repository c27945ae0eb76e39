//! GetPaymentHandler - Query handler for a single payment.

use std::sync::Arc;

use crate::domain::foundation::{AuthenticatedUser, PaymentId};
use crate::domain::payment::{Payment, PaymentError};
use crate::ports::PaymentRepository;

/// Query for one payment.
#[derive(Debug, Clone)]
pub struct GetPaymentQuery {
    pub payment_id: PaymentId,
    pub requester: AuthenticatedUser,
}

/// Handler for retrieving a payment.
///
/// Customers only see their own payments; another user's payment is
/// reported as not found so ids cannot be probed.
pub struct GetPaymentHandler {
    payments: Arc<dyn PaymentRepository>,
}

impl GetPaymentHandler {
    pub fn new(payments: Arc<dyn PaymentRepository>) -> Self {
        Self { payments }
    }

    pub async fn handle(&self, query: GetPaymentQuery) -> Result<Payment, PaymentError> {
        let payment = self
            .payments
            .find_by_id(&query.payment_id)
            .await?
            .filter(|p| query.requester.is_admin() || p.user_id == query.requester.id)
            .ok_or_else(|| PaymentError::payment_not_found(query.payment_id))?;

        Ok(payment)
    }
}

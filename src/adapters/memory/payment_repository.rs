//! In-memory payment repository.
//!
//! Enforces the same uniqueness rules as the PostgreSQL schema (reference
//! number, `(provider, external_id)`, one completed payment per order) and
//! the same conditional update, so orchestration tests exercise real race
//! outcomes without a database.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ErrorCode, OrderId, PaymentId, UserId};
use crate::domain::payment::{Payment, PaymentProvider, PaymentStatus};
use crate::ports::PaymentRepository;

/// In-memory implementation of the PaymentRepository port.
///
/// # Example
///
/// ```ignore
/// let repo = Arc::new(InMemoryPaymentRepository::new());
/// repo.insert(payment.clone());
///
/// assert_eq!(repo.all()[0].status, PaymentStatus::Completed);
/// ```
#[derive(Default)]
pub struct InMemoryPaymentRepository {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    /// Insertion order; queries sort newest first.
    payments: Vec<Payment>,
    sequence: u64,
    updates: usize,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, DomainError> {
        self.state.lock().map_err(|_| {
            DomainError::new(ErrorCode::InternalError, "Payment store lock poisoned")
        })
    }

    fn snapshot(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // === Test Helpers ===

    /// Seeds a payment without constraint checks.
    pub fn insert(&self, payment: Payment) {
        self.snapshot().payments.push(payment);
    }

    /// Every stored payment in insertion order.
    pub fn all(&self) -> Vec<Payment> {
        self.snapshot().payments.clone()
    }

    /// The stored copy of a payment.
    pub fn get(&self, id: &PaymentId) -> Option<Payment> {
        self.snapshot().payments.iter().find(|p| &p.id == id).cloned()
    }

    /// Number of conditional updates that were applied.
    pub fn applied_updates(&self) -> usize {
        self.snapshot().updates
    }
}

fn check_constraints(payments: &[Payment], candidate: &Payment) -> Result<(), DomainError> {
    for other in payments.iter().filter(|p| p.id != candidate.id) {
        if other.reference_number == candidate.reference_number {
            return Err(DomainError::new(
                ErrorCode::DuplicateReference,
                "Payment reference number already exists",
            ));
        }
        if let (Some(mine), Some(theirs)) = (candidate.external_id(), other.external_id()) {
            if other.provider == candidate.provider && mine == theirs {
                return Err(DomainError::new(
                    ErrorCode::DuplicateExternalId,
                    "Gateway transaction id already belongs to another payment",
                ));
            }
        }
        if candidate.status == PaymentStatus::Completed
            && other.status == PaymentStatus::Completed
            && other.order_id == candidate.order_id
        {
            return Err(DomainError::new(
                ErrorCode::PaymentAlreadyCompleted,
                "Order already has a completed payment",
            ));
        }
    }
    Ok(())
}

fn newest_first<'a>(payments: impl Iterator<Item = &'a Payment>) -> Vec<Payment> {
    let mut found: Vec<Payment> = payments.cloned().collect();
    found.reverse();
    found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    found
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn next_reference_sequence(&self) -> Result<u64, DomainError> {
        let mut state = self.lock()?;
        state.sequence += 1;
        Ok(state.sequence)
    }

    async fn save(&self, payment: &Payment) -> Result<(), DomainError> {
        let mut state = self.lock()?;
        if state.payments.iter().any(|p| p.id == payment.id) {
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                "Payment already exists",
            ));
        }
        check_constraints(&state.payments, payment)?;
        state.payments.push(payment.clone());
        Ok(())
    }

    async fn update_if_status(
        &self,
        payment: &Payment,
        expected: PaymentStatus,
    ) -> Result<bool, DomainError> {
        let mut state = self.lock()?;
        let index = state
            .payments
            .iter()
            .position(|p| p.id == payment.id)
            .ok_or_else(|| {
                DomainError::new(ErrorCode::PaymentNotFound, "Payment not found")
                    .with_detail("id", payment.id.to_string())
            })?;

        if state.payments[index].status != expected {
            return Ok(false);
        }
        check_constraints(&state.payments, payment)?;

        let stored = &mut state.payments[index];
        let mut updated = payment.clone();
        updated.external_id = stored.external_id.clone().or(updated.external_id);
        updated.paid_at = stored.paid_at.or(updated.paid_at);
        updated.refunded_at = stored.refunded_at.or(updated.refunded_at);
        updated.reference_number = stored.reference_number.clone();
        updated.amount = stored.amount;
        updated.currency = stored.currency.clone();
        *stored = updated;
        state.updates += 1;
        Ok(true)
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError> {
        Ok(self.lock()?.payments.iter().find(|p| &p.id == id).cloned())
    }

    async fn find_by_external_id(
        &self,
        provider: PaymentProvider,
        external_id: &str,
    ) -> Result<Option<Payment>, DomainError> {
        Ok(self
            .lock()?
            .payments
            .iter()
            .find(|p| p.provider == provider && p.external_id() == Some(external_id))
            .cloned())
    }

    async fn has_completed_for_order(&self, order_id: &OrderId) -> Result<bool, DomainError> {
        Ok(self
            .lock()?
            .payments
            .iter()
            .any(|p| &p.order_id == order_id && p.status == PaymentStatus::Completed))
    }

    async fn find_by_order(&self, order_id: &OrderId) -> Result<Vec<Payment>, DomainError> {
        let state = self.lock()?;
        Ok(newest_first(
            state.payments.iter().filter(|p| &p.order_id == order_id),
        ))
    }

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Payment>, DomainError> {
        let state = self.lock()?;
        Ok(newest_first(
            state.payments.iter().filter(|p| &p.user_id == user_id),
        ))
    }

    async fn find_all(&self) -> Result<Vec<Payment>, DomainError> {
        let state = self.lock()?;
        Ok(newest_first(state.payments.iter()))
    }
}

//! Payment repository port.
//!
//! Defines the contract for persisting payment attempts. Payments are never
//! deleted; every change after creation goes through
//! [`PaymentRepository::update_if_status`] so the synchronous charge path and
//! concurrent webhook deliveries cannot overwrite each other.
//!
//! # Example
//!
//! ```ignore
//! let mut payment = repo.find_by_id(&id).await?.ok_or(...)?;
//! let prior = payment.status;
//! payment.apply(PaymentStatus::Completed, outcome, Timestamp::now())?;
//! if !repo.update_if_status(&payment, prior).await? {
//!     // another writer got there first; reload and re-evaluate
//! }
//! ```

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, OrderId, PaymentId, UserId};
use crate::domain::payment::{Payment, PaymentProvider, PaymentStatus};

/// Repository port for Payment persistence.
///
/// Implementations must ensure:
/// - Unique reference numbers
/// - Unique `(provider, external_id)` once an external id is set
/// - At most one completed payment per order
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Next value of the reference number sequence.
    ///
    /// Values are never handed out twice, even under concurrent creation.
    async fn next_reference_sequence(&self) -> Result<u64, DomainError>;

    /// Insert a new payment.
    ///
    /// # Errors
    ///
    /// - `DuplicateReference` if the reference number is taken
    /// - `PaymentAlreadyCompleted` if the order already has a completed payment
    /// - `DatabaseError` on persistence failure
    async fn save(&self, payment: &Payment) -> Result<(), DomainError>;

    /// Write `payment` only if the stored status still equals `expected`.
    ///
    /// Returns `Ok(false)` when another writer changed the status first.
    ///
    /// # Errors
    ///
    /// - `PaymentNotFound` if the payment doesn't exist
    /// - `DuplicateExternalId` if another payment holds the external id
    /// - `PaymentAlreadyCompleted` if another payment for the order completed
    async fn update_if_status(
        &self,
        payment: &Payment,
        expected: PaymentStatus,
    ) -> Result<bool, DomainError>;

    /// Find a payment by its ID.
    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError>;

    /// Find the payment a gateway transaction belongs to.
    async fn find_by_external_id(
        &self,
        provider: PaymentProvider,
        external_id: &str,
    ) -> Result<Option<Payment>, DomainError>;

    /// Returns true if the order already has a completed payment.
    async fn has_completed_for_order(&self, order_id: &OrderId) -> Result<bool, DomainError>;

    /// All attempts for an order, newest first.
    async fn find_by_order(&self, order_id: &OrderId) -> Result<Vec<Payment>, DomainError>;

    /// All payments made by a user, newest first.
    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Payment>, DomainError>;

    /// Every payment, newest first.
    async fn find_all(&self) -> Result<Vec<Payment>, DomainError>;
}

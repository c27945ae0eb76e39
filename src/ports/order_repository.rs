//! Order store port.
//!
//! The order module owns order persistence. Payments only read orders and
//! request the PAID and REFUNDED edges.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, OrderId, Timestamp, UserId};
use crate::domain::order::{Order, OrderStatus};

/// Port for reading orders and requesting status transitions.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Find an order by its ID, regardless of owner.
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, DomainError>;

    /// Find an order only if it belongs to `owner`.
    async fn find_for_owner(
        &self,
        id: &OrderId,
        owner: &UserId,
    ) -> Result<Option<Order>, DomainError>;

    /// Move the order to `target`, stamping timestamps for the edge.
    ///
    /// Implementations serialize concurrent updates of the same order: the
    /// write only applies while the order is still in a status from which
    /// `target` is reachable.
    ///
    /// # Errors
    ///
    /// - `OrderNotFound` if the order doesn't exist
    /// - `InvalidStateTransition` if the order cannot move to `target`
    async fn transition_status(
        &self,
        id: &OrderId,
        target: OrderStatus,
        at: Timestamp,
    ) -> Result<Order, DomainError>;
}

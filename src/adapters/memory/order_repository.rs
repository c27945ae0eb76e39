//! In-memory order store.
//!
//! Applies transitions through `Order::advance` under one lock, which gives
//! the same per-order serialization as the conditional UPDATE in PostgreSQL.
//! Every applied transition is logged for assertions.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ErrorCode, OrderId, Timestamp, UserId};
use crate::domain::order::{Order, OrderStatus};
use crate::ports::OrderRepository;

/// In-memory implementation of the OrderRepository port.
#[derive(Default)]
pub struct InMemoryOrderRepository {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    orders: HashMap<OrderId, Order>,
    transitions: Vec<(OrderId, OrderStatus)>,
    fail_transitions: bool,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, DomainError> {
        self.state
            .lock()
            .map_err(|_| DomainError::new(ErrorCode::InternalError, "Order store lock poisoned"))
    }

    fn snapshot(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // === Test Helpers ===

    /// Stores an order as-is.
    pub fn insert(&self, order: Order) {
        self.snapshot().orders.insert(order.id, order);
    }

    /// The stored copy of an order.
    pub fn get(&self, id: &OrderId) -> Option<Order> {
        self.snapshot().orders.get(id).cloned()
    }

    /// Applied transitions, oldest first.
    pub fn transitions(&self) -> Vec<(OrderId, OrderStatus)> {
        self.snapshot().transitions.clone()
    }

    /// Number of applied transitions into `target` for an order.
    pub fn transition_count(&self, id: &OrderId, target: OrderStatus) -> usize {
        self.snapshot()
            .transitions
            .iter()
            .filter(|(order, status)| order == id && *status == target)
            .count()
    }

    /// Makes every transition fail with a database error.
    pub fn fail_transitions(&self, fail: bool) {
        self.snapshot().fail_transitions = fail;
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, DomainError> {
        Ok(self.lock()?.orders.get(id).cloned())
    }

    async fn find_for_owner(
        &self,
        id: &OrderId,
        owner: &UserId,
    ) -> Result<Option<Order>, DomainError> {
        Ok(self
            .lock()?
            .orders
            .get(id)
            .filter(|order| order.is_owned_by(owner))
            .cloned())
    }

    async fn transition_status(
        &self,
        id: &OrderId,
        target: OrderStatus,
        at: Timestamp,
    ) -> Result<Order, DomainError> {
        let mut state = self.lock()?;
        if state.fail_transitions {
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                "Simulated order store failure",
            ));
        }

        let order = state.orders.get_mut(id).ok_or_else(|| {
            DomainError::new(ErrorCode::OrderNotFound, "Order not found")
                .with_detail("id", id.to_string())
        })?;
        let mut next = order.clone();
        next.advance(target, at)?;
        *order = next.clone();
        state.transitions.push((*id, target));
        Ok(next)
    }
}

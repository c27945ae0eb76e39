//! PostgreSQL implementation of OrderRepository.
//!
//! Status transitions are single conditional UPDATEs: the row only changes
//! while it is still in a status from which the target is reachable, so
//! concurrent requests for the same order serialize in the database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, OrderId, Timestamp, UserId};
use crate::domain::order::{Order, OrderStatus};
use crate::ports::OrderRepository;

/// PostgreSQL implementation of the OrderRepository port.
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    /// Creates a new PostgresOrderRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn current_status(&self, id: &OrderId) -> Result<Option<OrderStatus>, DomainError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT status FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to find order", e))?;

        row.map(|(status,)| parse_status(&status)).transpose()
    }
}

/// Database row representation of an order.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: String,
    order_number: String,
    total: Decimal,
    currency: String,
    status: String,
    paid_at: Option<DateTime<Utc>>,
    shipped_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DomainError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            id: OrderId::from_uuid(row.id),
            user_id: UserId::new(row.user_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
            })?,
            order_number: row.order_number,
            total: row.total,
            currency: row.currency,
            status: parse_status(&row.status)?,
            paid_at: row.paid_at.map(Timestamp::from_datetime),
            shipped_at: row.shipped_at.map(Timestamp::from_datetime),
            delivered_at: row.delivered_at.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn parse_status(s: &str) -> Result<OrderStatus, DomainError> {
    OrderStatus::parse(s).ok_or_else(|| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid order status value: {}", s),
        )
    })
}

fn not_found(id: &OrderId) -> DomainError {
    DomainError::new(ErrorCode::OrderNotFound, "Order not found").with_detail("id", id.to_string())
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, DomainError> {
        let row: Option<OrderRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, order_number, total, currency, status,
                   paid_at, shipped_at, delivered_at, created_at, updated_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to find order", e))?;

        row.map(Order::try_from).transpose()
    }

    async fn find_for_owner(
        &self,
        id: &OrderId,
        owner: &UserId,
    ) -> Result<Option<Order>, DomainError> {
        let row: Option<OrderRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, order_number, total, currency, status,
                   paid_at, shipped_at, delivered_at, created_at, updated_at
            FROM orders
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id.as_uuid())
        .bind(owner.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to find order", e))?;

        row.map(Order::try_from).transpose()
    }

    async fn transition_status(
        &self,
        id: &OrderId,
        target: OrderStatus,
        at: Timestamp,
    ) -> Result<Order, DomainError> {
        let sources: Vec<&'static str> = OrderStatus::sources_of(target)
            .iter()
            .map(OrderStatus::as_str)
            .collect();

        let row: Option<OrderRow> = sqlx::query_as(
            r#"
            UPDATE orders SET
                status = $2,
                paid_at = CASE WHEN $2 = 'paid' THEN COALESCE(paid_at, $3) ELSE paid_at END,
                updated_at = $3
            WHERE id = $1 AND status = ANY($4)
            RETURNING id, user_id, order_number, total, currency, status,
                      paid_at, shipped_at, delivered_at, created_at, updated_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(target.as_str())
        .bind(at.as_datetime())
        .bind(&sources)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to update order status", e))?;

        if let Some(row) = row {
            return Order::try_from(row);
        }

        match self.current_status(id).await? {
            None => Err(not_found(id)),
            Some(current) => Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Cannot transition order {} from {} to {}", id, current, target),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn row_converts_to_order() {
        let now = Utc::now();
        let order = Order::try_from(OrderRow {
            id: Uuid::new_v4(),
            user_id: "user-1".to_string(),
            order_number: "ORD-20240101-0001".to_string(),
            total: dec!(118.00),
            currency: "PEN".to_string(),
            status: "confirmed".to_string(),
            paid_at: None,
            shipped_at: None,
            delivered_at: None,
            created_at: now,
            updated_at: now,
        })
        .unwrap();

        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.total, dec!(118.00));
    }

    #[test]
    fn parse_status_rejects_unknown_values() {
        assert!(parse_status("archived").is_err());
        assert_eq!(parse_status("PAID").unwrap(), OrderStatus::Paid);
    }
}

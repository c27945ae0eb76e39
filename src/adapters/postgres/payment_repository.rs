//! PostgreSQL implementation of PaymentRepository.
//!
//! Payments are append-only. Updates are conditional on the stored status so
//! the charge path and concurrent webhook deliveries never overwrite each
//! other, and the external id column is only ever filled once.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    DomainError, ErrorCode, OrderId, PaymentId, Timestamp, UserId,
};
use crate::domain::payment::{
    Payment, PaymentMethod, PaymentProvider, PaymentStatus, ReferenceNumber,
};
use crate::ports::PaymentRepository;

const PAYMENT_COLUMNS: &str = r#"
    id, reference_number, user_id, order_id, status, provider, method, amount, currency,
    external_id, card_mask, card_brand, provider_response, error_message, payer_email,
    paid_at, refunded_at, created_at, updated_at
"#;

/// PostgreSQL implementation of the PaymentRepository port.
pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    /// Creates a new PostgresPaymentRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_many(
        &self,
        filter: &str,
        bind: Option<BindValue<'_>>,
    ) -> Result<Vec<Payment>, DomainError> {
        let sql = select(filter);
        let query = sqlx::query_as::<_, PaymentRow>(&sql);
        let query = match bind {
            Some(BindValue::Uuid(value)) => query.bind(value),
            Some(BindValue::Text(value)) => query.bind(value),
            None => query,
        };

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to list payments", e))?;

        rows.into_iter().map(Payment::try_from).collect()
    }
}

enum BindValue<'a> {
    Uuid(Uuid),
    Text(&'a str),
}

fn select(filter: &str) -> String {
    format!("SELECT {} FROM payments {}", PAYMENT_COLUMNS, filter)
}

/// Database row representation of a payment.
#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    reference_number: String,
    user_id: String,
    order_id: Uuid,
    status: String,
    provider: String,
    method: String,
    amount: Decimal,
    currency: String,
    external_id: Option<String>,
    card_mask: Option<String>,
    card_brand: Option<String>,
    provider_response: Option<serde_json::Value>,
    error_message: Option<String>,
    payer_email: Option<String>,
    paid_at: Option<DateTime<Utc>>,
    refunded_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: PaymentId::from_uuid(row.id),
            reference_number: ReferenceNumber::parse(row.reference_number)
                .map_err(|e| corrupt("reference_number", e))?,
            user_id: UserId::new(row.user_id).map_err(|e| corrupt("user_id", e))?,
            order_id: OrderId::from_uuid(row.order_id),
            status: parse_status(&row.status)?,
            provider: row
                .provider
                .parse::<PaymentProvider>()
                .map_err(|e| corrupt("provider", e))?,
            method: row
                .method
                .parse::<PaymentMethod>()
                .map_err(|e| corrupt("method", e))?,
            amount: row.amount,
            currency: row.currency,
            external_id: row.external_id,
            card_mask: row.card_mask,
            card_brand: row.card_brand,
            provider_response: row.provider_response,
            error_message: row.error_message,
            payer_email: row.payer_email,
            paid_at: row.paid_at.map(Timestamp::from_datetime),
            refunded_at: row.refunded_at.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn corrupt(column: &str, err: impl std::fmt::Display) -> DomainError {
    DomainError::new(
        ErrorCode::DatabaseError,
        format!("Invalid {} value: {}", column, err),
    )
}

fn parse_status(s: &str) -> Result<PaymentStatus, DomainError> {
    PaymentStatus::parse(s).ok_or_else(|| corrupt("status", s))
}

/// Maps unique-constraint violations to the domain conflict they represent.
fn map_write_error(context: &str, err: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db_err) = &err {
        match db_err.constraint() {
            Some("payments_reference_number_key") => {
                return DomainError::new(
                    ErrorCode::DuplicateReference,
                    "Payment reference number already exists",
                );
            }
            Some("payments_provider_external_id_key") => {
                return DomainError::new(
                    ErrorCode::DuplicateExternalId,
                    "Gateway transaction id already belongs to another payment",
                );
            }
            Some("payments_one_completed_per_order") => {
                return DomainError::new(
                    ErrorCode::PaymentAlreadyCompleted,
                    "Order already has a completed payment",
                );
            }
            _ => {}
        }
    }
    DomainError::database(context, err)
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn next_reference_sequence(&self) -> Result<u64, DomainError> {
        let (value,): (i64,) = sqlx::query_as("SELECT nextval('payment_reference_seq')")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to draw reference sequence", e))?;

        u64::try_from(value).map_err(|_| corrupt("payment_reference_seq", value))
    }

    async fn save(&self, payment: &Payment) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, reference_number, user_id, order_id, status, provider, method, amount,
                currency, external_id, card_mask, card_brand, provider_response, error_message,
                payer_email, paid_at, refunded_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.reference_number.as_str())
        .bind(payment.user_id.as_str())
        .bind(payment.order_id.as_uuid())
        .bind(payment.status.as_str())
        .bind(payment.provider.as_str())
        .bind(payment.method.as_str())
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(&payment.external_id)
        .bind(&payment.card_mask)
        .bind(&payment.card_brand)
        .bind(&payment.provider_response)
        .bind(&payment.error_message)
        .bind(&payment.payer_email)
        .bind(payment.paid_at.map(|t| *t.as_datetime()))
        .bind(payment.refunded_at.map(|t| *t.as_datetime()))
        .bind(payment.created_at.as_datetime())
        .bind(payment.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error("Failed to save payment", e))?;

        Ok(())
    }

    async fn update_if_status(
        &self,
        payment: &Payment,
        expected: PaymentStatus,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payments SET
                status = $3,
                external_id = COALESCE(external_id, $4),
                card_mask = $5,
                card_brand = $6,
                provider_response = $7,
                error_message = $8,
                paid_at = COALESCE(paid_at, $9),
                refunded_at = COALESCE(refunded_at, $10),
                updated_at = $11
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(expected.as_str())
        .bind(payment.status.as_str())
        .bind(&payment.external_id)
        .bind(&payment.card_mask)
        .bind(&payment.card_brand)
        .bind(&payment.provider_response)
        .bind(&payment.error_message)
        .bind(payment.paid_at.map(|t| *t.as_datetime()))
        .bind(payment.refunded_at.map(|t| *t.as_datetime()))
        .bind(payment.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error("Failed to update payment", e))?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM payments WHERE id = $1")
            .bind(payment.id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to find payment", e))?;

        match exists {
            Some(_) => Ok(false),
            None => Err(DomainError::new(ErrorCode::PaymentNotFound, "Payment not found")
                .with_detail("id", payment.id.to_string())),
        }
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError> {
        let sql = select("WHERE id = $1");
        let row: Option<PaymentRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to find payment", e))?;

        row.map(Payment::try_from).transpose()
    }

    async fn find_by_external_id(
        &self,
        provider: PaymentProvider,
        external_id: &str,
    ) -> Result<Option<Payment>, DomainError> {
        let sql = select("WHERE provider = $1 AND external_id = $2");
        let row: Option<PaymentRow> = sqlx::query_as(&sql)
            .bind(provider.as_str())
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to find payment", e))?;

        row.map(Payment::try_from).transpose()
    }

    async fn has_completed_for_order(&self, order_id: &OrderId) -> Result<bool, DomainError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM payments WHERE order_id = $1 AND status = 'completed')",
        )
        .bind(order_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to check completed payments", e))?;

        Ok(exists)
    }

    async fn find_by_order(&self, order_id: &OrderId) -> Result<Vec<Payment>, DomainError> {
        self.fetch_many(
            "WHERE order_id = $1 ORDER BY created_at DESC",
            Some(BindValue::Uuid(*order_id.as_uuid())),
        )
        .await
    }

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Payment>, DomainError> {
        self.fetch_many(
            "WHERE user_id = $1 ORDER BY created_at DESC",
            Some(BindValue::Text(user_id.as_str())),
        )
        .await
    }

    async fn find_all(&self) -> Result<Vec<Payment>, DomainError> {
        self.fetch_many("ORDER BY created_at DESC", None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn row() -> PaymentRow {
        let now = Utc::now();
        PaymentRow {
            id: Uuid::new_v4(),
            reference_number: "PAY-20240115-0001".to_string(),
            user_id: "user-1".to_string(),
            order_id: Uuid::new_v4(),
            status: "completed".to_string(),
            provider: "mercadopago".to_string(),
            method: "card".to_string(),
            amount: dec!(118.00),
            currency: "PEN".to_string(),
            external_id: Some("123".to_string()),
            card_mask: Some("411111...1111".to_string()),
            card_brand: Some("visa".to_string()),
            provider_response: Some(json!({"status": "approved"})),
            error_message: None,
            payer_email: Some("buyer@example.com".to_string()),
            paid_at: Some(now),
            refunded_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn row_converts_to_payment() {
        let payment = Payment::try_from(row()).unwrap();

        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(payment.provider, PaymentProvider::MercadoPago);
        assert_eq!(payment.reference_number.as_str(), "PAY-20240115-0001");
        assert_eq!(payment.amount, dec!(118.00));
        assert!(payment.paid_at.is_some());
    }

    #[test]
    fn unknown_status_is_a_database_error() {
        let mut bad = row();
        bad.status = "settled".to_string();

        let err = Payment::try_from(bad).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[test]
    fn unknown_provider_is_a_database_error() {
        let mut bad = row();
        bad.provider = "paypal".to_string();

        assert!(Payment::try_from(bad).is_err());
    }

    #[test]
    fn select_appends_filter() {
        let sql = select("WHERE id = $1");
        assert!(sql.contains("FROM payments WHERE id = $1"));
        assert!(sql.contains("provider_response"));
    }
}

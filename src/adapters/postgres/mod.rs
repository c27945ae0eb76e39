//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! This module provides adapters for PostgreSQL-backed persistence:
//! - `PostgresPaymentRepository` - Append-only payments with conditional updates
//! - `PostgresOrderRepository` - Order reads and guarded status transitions

mod order_repository;
mod payment_repository;

pub use order_repository::PostgresOrderRepository;
pub use payment_repository::PostgresPaymentRepository;

//! In-memory adapters for tests and local development.
//!
//! - `InMemoryPaymentRepository` - Payment store with the database's uniqueness rules
//! - `InMemoryOrderRepository` - Order store with a transition log

mod order_repository;
mod payment_repository;

pub use order_repository::InMemoryOrderRepository;
pub use payment_repository::InMemoryPaymentRepository;

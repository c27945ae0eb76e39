//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `PaymentGateway` - Charge, refund and status calls against one provider
//! - `PaymentRepository` - Durable payment records with conditional updates
//! - `OrderRepository` - Order reads and the PAID/REFUNDED transitions
//! - `PaymentNotifier` - Best-effort email and push channels
//! - `SessionValidator` - Bearer token validation

mod order_repository;
mod payment_gateway;
mod payment_notifier;
mod payment_repository;
mod session_validator;

pub use order_repository::OrderRepository;
pub use payment_gateway::{
    ChargeRequest, ChargeResult, GatewayError, GatewayErrorCode, GatewayRegistry,
    PayerIdentification, PaymentGateway, ProviderStatus, RefundRequest, RefundResult,
};
pub use payment_notifier::{
    NotificationError, NotificationKind, PaymentNotification, PaymentNotifier,
};
pub use payment_repository::PaymentRepository;
pub use session_validator::SessionValidator;

//! HTTP adapter for payment endpoints.
//!
//! Exposes the payment domain via REST API:
//! - `POST /payments` - Charge an order
//! - `GET /payments` - Caller's payments
//! - `GET /payments/:id` - One payment
//! - `GET /payments/order/:order_id` - Attempts for an order
//! - `GET /payments/admin/all` - Every payment (admin)
//! - `POST /payments/:id/refund` - Refund a completed payment (admin)
//! - `POST /payments/:id/sync` - Settle a stuck payment (admin)
//! - `POST /payments/webhooks/{culqi,mercadopago,stripe}` - Gateway webhooks
//! - `GET /health` - Liveness probe

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::{PaymentApiError, PaymentsAppState};
pub use routes::{payment_routes, payments_router, webhook_routes, HttpOptions};

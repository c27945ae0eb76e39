//! HTTP adapters - REST API implementations.
//!
//! - `payments` - Payment endpoints and gateway webhooks
//! - `middleware` - Bearer authentication and role extractors

pub mod middleware;
pub mod payments;

// Re-export key types for convenience
pub use payments::{payments_router, HttpOptions, PaymentsAppState};

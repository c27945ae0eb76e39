//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `order` - The order lifecycle edges payments drive
//! - `payment` - Payment attempts, reconciliation rules and webhook verification

pub mod foundation;
pub mod order;
pub mod payment;

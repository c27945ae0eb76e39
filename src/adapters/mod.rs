//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `auth` - Session validators (JWT, mock)
//! - `gateways` - Culqi, MercadoPago and Stripe clients, plus a mock gateway
//! - `http` - Axum REST API and webhook endpoints
//! - `memory` - In-memory repositories for tests and local runs
//! - `notification` - Email and push notifiers
//! - `postgres` - PostgreSQL repositories

pub mod auth;
pub mod gateways;
pub mod http;
pub mod memory;
pub mod notification;
pub mod postgres;

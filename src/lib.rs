//! Storefront Payments - Payment orchestration and webhook reconciliation
//!
//! This crate charges customers through Culqi, MercadoPago or Stripe, keeps a
//! durable payment record per attempt, and reconciles that record with the
//! asynchronous, signed webhooks each gateway delivers.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod startup;

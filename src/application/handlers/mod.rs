//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod payment;

pub use payment::{
    // Shared services
    AppliedTransition, NotificationDispatcher, PaymentTransitions,
    // Commands
    CreatePaymentCommand, CreatePaymentHandler,
    HandleWebhookCommand, HandleWebhookHandler, WebhookOutcome, WebhookVerifiers,
    RefundPaymentCommand, RefundPaymentHandler,
    SyncPaymentStatusCommand, SyncPaymentStatusHandler,
    // Queries
    GetPaymentHandler, GetPaymentQuery,
    ListOrderPaymentsHandler, ListOrderPaymentsQuery, ListPaymentsHandler, ListPaymentsQuery,
};

//! Payment handlers.
//!
//! ## Commands
//! - Creating payments (charge through a gateway)
//! - Refunding completed payments (admin)
//! - Reconciling gateway webhooks
//! - Syncing stuck payments with the gateway (admin)
//!
//! ## Queries
//! - Get one payment
//! - List the caller's payments, all payments, or an order's attempts
//!
//! Every status change goes through `PaymentTransitions`.

mod create_payment;
mod dispatcher;
mod get_payment;
mod handle_webhook;
mod list_payments;
mod refund_payment;
mod sync_payment_status;
mod transitions;

// Shared services
pub use dispatcher::NotificationDispatcher;
pub use transitions::{AppliedTransition, PaymentTransitions, RefundClaim};

// Commands
pub use create_payment::{CreatePaymentCommand, CreatePaymentHandler};
pub use handle_webhook::{
    HandleWebhookCommand, HandleWebhookHandler, WebhookOutcome, WebhookVerifiers,
};
pub use refund_payment::{RefundPaymentCommand, RefundPaymentHandler};
pub use sync_payment_status::{SyncPaymentStatusCommand, SyncPaymentStatusHandler};

// Queries
pub use get_payment::{GetPaymentHandler, GetPaymentQuery};
pub use list_payments::{
    ListOrderPaymentsHandler, ListOrderPaymentsQuery, ListPaymentsHandler, ListPaymentsQuery,
};

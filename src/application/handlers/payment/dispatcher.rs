//! Best-effort notification dispatch.
//!
//! Each delivery runs as its own Tokio task so the payment transition that
//! triggered it never waits on, or fails because of, a notification channel.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::ports::{PaymentNotification, PaymentNotifier};

/// Spawns notification deliveries and logs their failures.
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn PaymentNotifier>,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn PaymentNotifier>) -> Self {
        Self { notifier }
    }

    /// Starts delivery in the background.
    ///
    /// The returned handle is only for tests that need to wait for the
    /// delivery; callers normally drop it.
    pub fn dispatch(&self, notification: PaymentNotification) -> JoinHandle<()> {
        let notifier = Arc::clone(&self.notifier);
        let span = tracing::info_span!(
            "notify",
            payment_id = %notification.payment_id,
            kind = notification.kind.as_str()
        );

        tokio::spawn(
            async move {
                if let Err(e) = notifier.notify(&notification).await {
                    tracing::warn!(error = %e, "Payment notification failed");
                }
            }
            .instrument(span),
        )
    }
}

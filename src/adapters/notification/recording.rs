//! Recording notifier for tests.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::ports::{NotificationError, NotificationKind, PaymentNotification, PaymentNotifier};

/// Captures every notification it receives.
#[derive(Default)]
pub struct RecordingNotifier {
    received: Mutex<Vec<PaymentNotification>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier that records and then reports a delivery failure.
    pub fn failing() -> Self {
        Self {
            received: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PaymentNotification>> {
        self.received.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn notifications(&self) -> Vec<PaymentNotification> {
        self.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    pub fn count_of(&self, kind: NotificationKind) -> usize {
        self.lock().iter().filter(|n| n.kind == kind).count()
    }
}

#[async_trait]
impl PaymentNotifier for RecordingNotifier {
    async fn notify(&self, notification: &PaymentNotification) -> Result<(), NotificationError> {
        self.lock().push(notification.clone());
        if self.fail {
            return Err(NotificationError::Delivery("simulated failure".to_string()));
        }
        Ok(())
    }
}

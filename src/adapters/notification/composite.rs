//! Fans one notification out to every configured channel.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;

use crate::ports::{NotificationError, PaymentNotification, PaymentNotifier};

/// Delivers to all channels concurrently.
///
/// Every channel is attempted. A failing channel does not stop the others;
/// the first error is returned after all have finished.
#[derive(Clone, Default)]
pub struct CompositeNotifier {
    channels: Vec<Arc<dyn PaymentNotifier>>,
}

impl CompositeNotifier {
    pub fn new(channels: Vec<Arc<dyn PaymentNotifier>>) -> Self {
        Self { channels }
    }

    pub fn with_channel(mut self, channel: Arc<dyn PaymentNotifier>) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

#[async_trait]
impl PaymentNotifier for CompositeNotifier {
    async fn notify(&self, notification: &PaymentNotification) -> Result<(), NotificationError> {
        let results = join_all(self.channels.iter().map(|c| c.notify(notification))).await;
        results.into_iter().collect::<Result<Vec<()>, _>>().map(|_| ())
    }
}

//! Notification adapters - Implementations of the `PaymentNotifier` port.
//!
//! - `ResendEmailNotifier` - Email via the Resend HTTP API
//! - `LogPushNotifier` - In-app push payload emitted as a log event
//! - `CompositeNotifier` - Fans out to several channels
//! - `RecordingNotifier` - Captures notifications in tests

mod composite;
mod push;
mod recording;
mod resend;

pub use composite::CompositeNotifier;
pub use push::{LogPushNotifier, PushMessage};
pub use recording::RecordingNotifier;
pub use resend::{ResendConfig, ResendEmailNotifier};

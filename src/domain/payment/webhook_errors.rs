//! Webhook error types.
//!
//! Verification failures abort processing before any state is read or
//! written. The status code determines whether the gateway retries.

use axum::http::StatusCode;
use thiserror::Error;

use super::PaymentError;

/// Errors raised while authenticating or decoding a webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    /// A signature header required by the provider is absent.
    #[error("Missing signature header: {0}")]
    MissingSignature(&'static str),

    /// Signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Signed timestamp is outside the replay window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Failed to parse the signature header or the payload.
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl WebhookError {
    /// Returns true for failures that mean the delivery is not authentic.
    pub fn is_authentication_failure(&self) -> bool {
        !matches!(self, WebhookError::ParseError(_))
    }

    /// Maps the error to an HTTP status code.
    ///
    /// 4xx responses stop gateways from retrying a delivery that can never
    /// succeed.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::MissingSignature(_)
            | WebhookError::InvalidSignature
            | WebhookError::TimestampOutOfRange => StatusCode::UNAUTHORIZED,
            WebhookError::ParseError(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<WebhookError> for PaymentError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::ParseError(msg) => PaymentError::validation("payload", msg),
            other => PaymentError::authentication(other.to_string()),
        }
    }
}

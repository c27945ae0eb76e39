//! Payment-specific error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | NotFound | 404 |
//! | InvalidState | 400 |
//! | Conflict | 409 |
//! | Gateway | 402 |
//! | Authentication | 401 |
//! | Forbidden | 403 |
//! | ValidationFailed | 400 |
//! | Internal | 500 |

use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};

use super::PaymentProvider;

/// Payment-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    /// The payment or order does not exist, or is not visible to the caller.
    NotFound { resource: &'static str, id: String },

    /// The payment or order is not in a state that permits the operation.
    InvalidState(String),

    /// The operation would duplicate a completed payment.
    Conflict(String),

    /// The gateway declined the charge or could not be reached.
    Gateway {
        provider: Option<PaymentProvider>,
        message: String,
    },

    /// Webhook signature invalid or outside the replay window.
    Authentication(String),

    /// Caller is authenticated but not allowed to perform the operation.
    Forbidden(String),

    /// Request data failed validation.
    ValidationFailed { field: String, message: String },

    /// Unexpected failure (database, serialization, bugs).
    Internal(String),
}

impl PaymentError {
    pub fn payment_not_found(id: impl ToString) -> Self {
        PaymentError::NotFound {
            resource: "Payment",
            id: id.to_string(),
        }
    }

    pub fn order_not_found(id: impl ToString) -> Self {
        PaymentError::NotFound {
            resource: "Order",
            id: id.to_string(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        PaymentError::InvalidState(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        PaymentError::Conflict(message.into())
    }

    pub fn gateway(provider: PaymentProvider, message: impl Into<String>) -> Self {
        PaymentError::Gateway {
            provider: Some(provider),
            message: message.into(),
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        PaymentError::Authentication(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        PaymentError::Forbidden(message.into())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        PaymentError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        PaymentError::Internal(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            PaymentError::NotFound { resource: "Order", .. } => ErrorCode::OrderNotFound,
            PaymentError::NotFound { .. } => ErrorCode::PaymentNotFound,
            PaymentError::InvalidState(_) => ErrorCode::InvalidStateTransition,
            PaymentError::Conflict(_) => ErrorCode::PaymentAlreadyCompleted,
            PaymentError::Gateway { .. } => ErrorCode::GatewayError,
            PaymentError::Authentication(_) => ErrorCode::Unauthorized,
            PaymentError::Forbidden(_) => ErrorCode::Forbidden,
            PaymentError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            PaymentError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Returns a user-facing error message.
    ///
    /// Gateway errors carry the provider's own decline reason so the customer
    /// can act on it.
    pub fn message(&self) -> String {
        match self {
            PaymentError::NotFound { resource, id } => format!("{} {} not found", resource, id),
            PaymentError::InvalidState(msg) => msg.clone(),
            PaymentError::Conflict(msg) => msg.clone(),
            PaymentError::Gateway { message, .. } => format!("Payment failed: {}", message),
            PaymentError::Authentication(msg) => msg.clone(),
            PaymentError::Forbidden(msg) => msg.clone(),
            PaymentError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            PaymentError::Internal(msg) => format!("Internal error: {}", msg),
        }
    }

    /// Returns true for errors caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, PaymentError::Internal(_))
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for PaymentError {}

impl From<DomainError> for PaymentError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::PaymentNotFound => PaymentError::NotFound {
                resource: "Payment",
                id: err.details.get("id").cloned().unwrap_or_default(),
            },
            ErrorCode::OrderNotFound => PaymentError::NotFound {
                resource: "Order",
                id: err.details.get("id").cloned().unwrap_or_default(),
            },
            ErrorCode::InvalidStateTransition => PaymentError::InvalidState(err.message),
            ErrorCode::PaymentAlreadyCompleted
            | ErrorCode::DuplicateExternalId
            | ErrorCode::DuplicateReference => PaymentError::Conflict(err.message),
            ErrorCode::ValidationFailed
            | ErrorCode::EmptyField
            | ErrorCode::OutOfRange
            | ErrorCode::InvalidFormat => PaymentError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            ErrorCode::Unauthorized => PaymentError::Authentication(err.message),
            ErrorCode::Forbidden => PaymentError::Forbidden(err.message),
            ErrorCode::GatewayError => PaymentError::Gateway {
                provider: None,
                message: err.message,
            },
            ErrorCode::DatabaseError | ErrorCode::InternalError => {
                PaymentError::Internal(err.to_string())
            }
        }
    }
}

impl From<ValidationError> for PaymentError {
    fn from(err: ValidationError) -> Self {
        PaymentError::ValidationFailed {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}

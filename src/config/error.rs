//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid bind address {0}")]
    InvalidSocketAddress(String),

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Request timeout must exceed the gateway timeout")]
    TimeoutBelowGateway,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("JWT secret must be at least 32 characters")]
    WeakJwtSecret,

    #[error("Gateway timeout must be between 1 and 60 seconds")]
    InvalidGatewayTimeout,

    #[error("Webhook secret required for {0} in production")]
    MissingWebhookSecret(&'static str),

    #[error("Base URL for {0} must use HTTP or HTTPS")]
    InvalidBaseUrl(&'static str),

    #[error("Invalid Resend API key format")]
    InvalidResendKey,

    #[error("Invalid from email address")]
    InvalidFromEmail,
}

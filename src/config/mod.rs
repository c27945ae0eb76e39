//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `STOREFRONT` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use storefront_payments::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on port {}", config.server.port);
//! ```

mod auth;
mod database;
mod error;
mod notification;
mod payment;
mod server;

pub use auth::AuthConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use notification::NotificationConfig;
pub use payment::{PaymentConfig, ProviderConfig};
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Bearer token verification
    pub auth: AuthConfig,

    /// Gateway credentials and webhook secrets
    #[serde(default)]
    pub payment: PaymentConfig,

    /// Customer notifications (email, push)
    #[serde(default)]
    pub notification: NotificationConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `STOREFRONT` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `STOREFRONT__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `STOREFRONT__PAYMENT__CULQI__API_KEY=...` -> `payment.culqi.api_key = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Required environment variables are missing
    /// - Values cannot be parsed into expected types
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("STOREFRONT")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.auth.validate(&self.server.environment)?;
        self.payment.validate(&self.server.environment)?;
        self.notification.validate()?;

        // A request cancelled mid-charge leaves the attempt to reconciliation
        if self.server.request_timeout_secs <= self.payment.gateway_timeout_secs {
            return Err(ValidationError::TimeoutBelowGateway);
        }
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::PaymentProvider;
    use secrecy::ExposeSecret;
    use std::env;
    use std::sync::Mutex;

    // env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "STOREFRONT__DATABASE__URL",
        "STOREFRONT__AUTH__JWT_SECRET",
        "STOREFRONT__SERVER__PORT",
        "STOREFRONT__SERVER__ENVIRONMENT",
        "STOREFRONT__SERVER__REQUEST_TIMEOUT_SECS",
        "STOREFRONT__PAYMENT__GATEWAY_TIMEOUT_SECS",
        "STOREFRONT__PAYMENT__CULQI__API_KEY",
        "STOREFRONT__PAYMENT__CULQI__WEBHOOK_SECRET",
    ];

    fn set_minimal_env() {
        env::set_var("STOREFRONT__DATABASE__URL", "postgresql://store@localhost/storefront");
        env::set_var("STOREFRONT__AUTH__JWT_SECRET", "dev-secret");
    }

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.database.url, "postgresql://store@localhost/storefront");
        assert_eq!(config.auth.jwt_secret.expose_secret(), "dev-secret");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_server_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, Environment::Development);
        assert_eq!(config.payment.gateway_timeout_secs, 20);
    }

    #[test]
    fn test_nested_provider_settings() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("STOREFRONT__PAYMENT__CULQI__API_KEY", "sk_test_culqi");
        env::set_var("STOREFRONT__PAYMENT__CULQI__WEBHOOK_SECRET", "culqi-signing");
        env::set_var("STOREFRONT__PAYMENT__GATEWAY_TIMEOUT_SECS", "15");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.payment.configured_providers(), vec![PaymentProvider::Culqi]);
        assert!(config.payment.culqi.webhook_secret().is_some());
        assert_eq!(config.payment.gateway_timeout_secs, 15);
    }

    #[test]
    fn test_production_without_webhook_secret_is_invalid() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("STOREFRONT__SERVER__ENVIRONMENT", "production");
        env::set_var("STOREFRONT__AUTH__JWT_SECRET", "k".repeat(40));
        env::set_var("STOREFRONT__PAYMENT__CULQI__API_KEY", "sk_live_culqi");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.is_production());
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingWebhookSecret("culqi"))
        );
    }

    #[test]
    fn test_gateway_timeout_must_fit_in_request_timeout() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("STOREFRONT__SERVER__REQUEST_TIMEOUT_SECS", "20");
        let result = AppConfig::load();
        clear_env();

        assert_eq!(
            result.unwrap().validate(),
            Err(ValidationError::TimeoutBelowGateway)
        );
    }

    #[test]
    fn test_custom_server_port() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("STOREFRONT__SERVER__PORT", "3000");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 3000);
    }
}

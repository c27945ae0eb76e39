//! Authentication configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

/// Minimum HS256 secret length accepted in production.
const MIN_SECRET_LEN: usize = 32;

/// Authentication configuration (HS256 bearer tokens)
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Shared secret used to verify token signatures
    pub jwt_secret: SecretString,

    /// Expected `iss` claim, when tokens carry one
    #[serde(default)]
    pub jwt_issuer: Option<String>,
}

impl AuthConfig {
    /// Validate authentication configuration
    ///
    /// Short secrets are tolerated outside production.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        let secret = self.jwt_secret.expose_secret();
        if secret.is_empty() {
            return Err(ValidationError::MissingRequired("AUTH__JWT_SECRET"));
        }
        if *environment == Environment::Production && secret.len() < MIN_SECRET_LEN {
            return Err(ValidationError::WeakJwtSecret);
        }
        Ok(())
    }
}

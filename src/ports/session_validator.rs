//! Session validation port for bearer token validation.
//!
//! HTTP middleware uses this port to turn a bearer token into an
//! [`AuthenticatedUser`]. The production adapter validates HS256 JWTs issued
//! by the storefront's user module.

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser};

/// Validates access tokens and extracts user identity.
///
/// # Contract
///
/// Implementations must:
/// - Validate the token signature and expiry
/// - Return `AuthError::InvalidToken` for malformed or badly signed tokens
/// - Return `AuthError::TokenExpired` for expired tokens
/// - Return `AuthError::ServiceUnavailable` for transient errors
#[async_trait]
pub trait SessionValidator: Send + Sync {
    /// Validate a token (without the "Bearer " prefix) and return its user.
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::auth::MockSessionValidator;
    use std::sync::Arc;

    #[tokio::test]
    async fn admin_role_survives_dynamic_dispatch() {
        let validator: Arc<dyn SessionValidator> =
            Arc::new(MockSessionValidator::new().with_test_admin("ops-token", "ops-1"));

        let admin = validator.validate("ops-token").await.unwrap();

        assert_eq!(admin.id.as_str(), "ops-1");
        assert!(admin.is_admin());
        assert!(matches!(
            validator.validate("unknown").await,
            Err(AuthError::InvalidToken)
        ));
    }
}

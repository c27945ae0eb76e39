//! Mock session validator for testing.
//!
//! # Example
//!
//! ```ignore
//! let validator = MockSessionValidator::new()
//!     .with_test_user("buyer-token", "user-1")
//!     .with_test_admin("admin-token", "admin-1");
//!
//! let user = validator.validate("buyer-token").await?;
//! ```

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser, Role, UserId};
use crate::ports::SessionValidator;

/// Mock session validator for testing.
///
/// Stores a map of tokens to users. Tokens not in the map return `InvalidToken`.
#[derive(Debug, Default)]
pub struct MockSessionValidator {
    /// Map of valid tokens to their associated users
    tokens: RwLock<HashMap<String, AuthenticatedUser>>,
    /// Optional error to return for all validations (for error testing)
    force_error: RwLock<Option<AuthError>>,
}

impl MockSessionValidator {
    /// Creates a new empty mock validator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a valid token that maps to a user.
    pub fn with_user(self, token: impl Into<String>, user: AuthenticatedUser) -> Self {
        self.add_token(token, user);
        self
    }

    /// Adds a valid token for a plain customer. Empty ids are ignored.
    pub fn with_test_user(self, token: impl Into<String>, user_id: &str) -> Self {
        match test_user(user_id, vec![Role::User]) {
            Some(user) => self.with_user(token, user),
            None => self,
        }
    }

    /// Adds a valid token for an administrator. Empty ids are ignored.
    pub fn with_test_admin(self, token: impl Into<String>, user_id: &str) -> Self {
        match test_user(user_id, vec![Role::User, Role::Admin]) {
            Some(user) => self.with_user(token, user),
            None => self,
        }
    }

    /// Forces all validations to return the specified error.
    pub fn with_error(self, error: AuthError) -> Self {
        if let Ok(mut forced) = self.force_error.write() {
            *forced = Some(error);
        }
        self
    }

    /// Registers a new valid token at runtime.
    pub fn add_token(&self, token: impl Into<String>, user: AuthenticatedUser) {
        if let Ok(mut tokens) = self.tokens.write() {
            tokens.insert(token.into(), user);
        }
    }
}

fn test_user(user_id: &str, roles: Vec<Role>) -> Option<AuthenticatedUser> {
    let id = UserId::new(user_id).ok()?;
    Some(AuthenticatedUser::new(
        id,
        Some(format!("{}@test.example.com", user_id)),
        roles,
    ))
}

#[async_trait]
impl SessionValidator for MockSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let forced = self
            .force_error
            .read()
            .map_err(|_| AuthError::service_unavailable("mock lock poisoned"))?
            .clone();
        if let Some(error) = forced {
            return Err(error);
        }

        self.tokens
            .read()
            .map_err(|_| AuthError::service_unavailable("mock lock poisoned"))?
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}

//! Authentication types for the domain layer.
//!
//! An `AuthenticatedUser` is produced by the `SessionValidator` port after a
//! bearer token has been checked. Handlers only ever see this type, never the
//! raw token claims.

use super::UserId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Roles a storefront user can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    /// Parses a role claim, ignoring roles this service does not know.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Authenticated user extracted from a validated token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// The unique user identifier (token subject).
    pub id: UserId,

    /// User's email address from the token claims, if present.
    pub email: Option<String>,

    /// Roles granted to the user.
    pub roles: Vec<Role>,
}

impl AuthenticatedUser {
    pub fn new(id: UserId, email: Option<String>, roles: Vec<Role>) -> Self {
        Self { id, email, roles }
    }

    /// Returns true if the user holds the given role.
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Shorthand for the admin check used by refund and reporting endpoints.
    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }
}

/// Authentication errors that can occur during token validation.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The token is missing, malformed, or has an invalid signature.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// The token has expired.
    #[error("Token expired")]
    TokenExpired,

    /// User is authenticated but lacks the role for this action.
    #[error("Insufficient permissions")]
    InsufficientPermissions,

    /// The authentication backend is unavailable.
    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Returns true if this error indicates the user should re-authenticate.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, AuthError::InvalidToken | AuthError::TokenExpired)
    }
}

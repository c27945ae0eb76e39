//! Notification configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// Customer notification configuration (Resend email, push)
///
/// Push notifications are always logged; email is opt-in.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// Send payment emails through Resend
    #[serde(default)]
    pub email_enabled: bool,

    /// Resend API key
    #[serde(default)]
    pub resend_api_key: Option<SecretString>,

    /// From email address
    #[serde(default = "default_from_email")]
    pub from_email: String,

    /// From name
    #[serde(default = "default_from_name")]
    pub from_name: String,

    /// Overrides the Resend API base URL
    #[serde(default)]
    pub api_base_url: Option<String>,
}

impl NotificationConfig {
    /// Get formatted "From" header value
    pub fn from_header(&self) -> String {
        format!("{} <{}>", self.from_name, self.from_email)
    }

    /// Validate notification configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.email_enabled {
            return Ok(());
        }
        let key = self
            .resend_api_key
            .as_ref()
            .map(|k| k.expose_secret().as_str())
            .unwrap_or_default();
        if key.is_empty() {
            return Err(ValidationError::MissingRequired("NOTIFICATION__RESEND_API_KEY"));
        }
        if !key.starts_with("re_") {
            return Err(ValidationError::InvalidResendKey);
        }
        if !self.from_email.contains('@') {
            return Err(ValidationError::InvalidFromEmail);
        }
        Ok(())
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            email_enabled: false,
            resend_api_key: None,
            from_email: default_from_email(),
            from_name: default_from_name(),
            api_base_url: None,
        }
    }
}

fn default_from_email() -> String {
    "noreply@storefront.example".to_string()
}

fn default_from_name() -> String {
    "Storefront".to_string()
}

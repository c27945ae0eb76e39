//! Payment gateway configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use crate::domain::payment::PaymentProvider;

use super::error::ValidationError;
use super::server::Environment;

/// Credentials and endpoint for one gateway.
///
/// A provider without an `api_key` is not registered at startup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderConfig {
    /// Secret API key or access token
    #[serde(default)]
    pub api_key: Option<SecretString>,

    /// Webhook signing secret
    #[serde(default)]
    pub webhook_secret: Option<SecretString>,

    /// Overrides the gateway's public API base URL
    #[serde(default)]
    pub base_url: Option<String>,
}

impl ProviderConfig {
    /// The API key, when one is set and not blank.
    pub fn api_key(&self) -> Option<&SecretString> {
        self.api_key
            .as_ref()
            .filter(|key| !key.expose_secret().trim().is_empty())
    }

    /// The webhook secret, when one is set and not blank.
    pub fn webhook_secret(&self) -> Option<&SecretString> {
        self.webhook_secret
            .as_ref()
            .filter(|secret| !secret.expose_secret().trim().is_empty())
    }

    pub fn is_configured(&self) -> bool {
        self.api_key().is_some()
    }
}

/// Payment configuration (Culqi, MercadoPago, Stripe)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Timeout for each outbound gateway call, in seconds
    #[serde(default = "default_gateway_timeout")]
    pub gateway_timeout_secs: u64,

    #[serde(default)]
    pub culqi: ProviderConfig,

    #[serde(default)]
    pub mercadopago: ProviderConfig,

    #[serde(default)]
    pub stripe: ProviderConfig,
}

impl PaymentConfig {
    /// Get gateway timeout as Duration
    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }

    /// Settings for one provider
    pub fn provider(&self, provider: PaymentProvider) -> &ProviderConfig {
        match provider {
            PaymentProvider::Culqi => &self.culqi,
            PaymentProvider::MercadoPago => &self.mercadopago,
            PaymentProvider::Stripe => &self.stripe,
        }
    }

    /// Providers with an API key, in declaration order
    pub fn configured_providers(&self) -> Vec<PaymentProvider> {
        PaymentProvider::ALL
            .into_iter()
            .filter(|p| self.provider(*p).is_configured())
            .collect()
    }

    /// Validate payment configuration
    ///
    /// Production requires a webhook secret for every registered provider.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if !(1..=60).contains(&self.gateway_timeout_secs) {
            return Err(ValidationError::InvalidGatewayTimeout);
        }

        for provider in self.configured_providers() {
            let settings = self.provider(provider);
            if let Some(url) = &settings.base_url {
                if !url.starts_with("https://") && !url.starts_with("http://") {
                    return Err(ValidationError::InvalidBaseUrl(provider.as_str()));
                }
            }
            if *environment == Environment::Production && settings.webhook_secret().is_none() {
                return Err(ValidationError::MissingWebhookSecret(provider.as_str()));
            }
        }

        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            gateway_timeout_secs: default_gateway_timeout(),
            culqi: ProviderConfig::default(),
            mercadopago: ProviderConfig::default(),
            stripe: ProviderConfig::default(),
        }
    }
}

fn default_gateway_timeout() -> u64 {
    20
}

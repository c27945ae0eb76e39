//! Startup wiring from configuration to adapters.
//!
//! Builds the gateway registry, webhook verifiers and notifier chain that the
//! HTTP state is assembled from.

use std::sync::Arc;

use anyhow::Context;

use crate::adapters::gateways::{
    CulqiConfig, CulqiGateway, MercadoPagoConfig, MercadoPagoGateway, StripeConfig, StripeGateway,
};
use crate::adapters::notification::{
    CompositeNotifier, LogPushNotifier, ResendConfig, ResendEmailNotifier,
};
use crate::application::WebhookVerifiers;
use crate::config::{NotificationConfig, PaymentConfig};
use crate::domain::payment::PaymentProvider;
use crate::ports::{GatewayRegistry, PaymentGateway, PaymentNotifier};

/// Registers a gateway for every provider with an API key.
///
/// # Errors
///
/// Fails when a gateway's HTTP client cannot be built.
pub fn gateway_registry(config: &PaymentConfig) -> anyhow::Result<GatewayRegistry> {
    let timeout = config.gateway_timeout();
    let mut registry = GatewayRegistry::new();

    for provider in config.configured_providers() {
        let settings = config.provider(provider);
        let Some(api_key) = settings.api_key().cloned() else {
            continue;
        };
        let base_url = settings.base_url.clone();

        let gateway: Arc<dyn PaymentGateway> = match provider {
            PaymentProvider::Culqi => {
                let mut cfg = CulqiConfig::new(api_key).with_timeout(timeout);
                if let Some(url) = base_url {
                    cfg = cfg.with_base_url(url);
                }
                Arc::new(CulqiGateway::new(cfg).with_context(|| client_error(provider))?)
            }
            PaymentProvider::MercadoPago => {
                let mut cfg = MercadoPagoConfig::new(api_key).with_timeout(timeout);
                if let Some(url) = base_url {
                    cfg = cfg.with_base_url(url);
                }
                Arc::new(MercadoPagoGateway::new(cfg).with_context(|| client_error(provider))?)
            }
            PaymentProvider::Stripe => {
                let mut cfg = StripeConfig::new(api_key).with_timeout(timeout);
                if let Some(url) = base_url {
                    cfg = cfg.with_base_url(url);
                }
                Arc::new(StripeGateway::new(cfg).with_context(|| client_error(provider))?)
            }
        };

        tracing::info!(provider = %provider, "Payment gateway registered");
        registry = registry.register(gateway);
    }

    Ok(registry)
}

fn client_error(provider: PaymentProvider) -> String {
    format!("building HTTP client for {}", provider)
}

/// Signing secrets for registered providers.
///
/// Registered providers without a secret are logged once; their webhooks are
/// accepted unsigned.
pub fn webhook_verifiers(config: &PaymentConfig) -> WebhookVerifiers {
    config
        .configured_providers()
        .into_iter()
        .fold(WebhookVerifiers::new(), |verifiers, provider| {
            match config.provider(provider).webhook_secret() {
                Some(secret) => verifiers.with_secret(provider, secret.clone()),
                None => {
                    tracing::warn!(
                        provider = %provider,
                        "No webhook secret configured, signature checks disabled"
                    );
                    verifiers
                }
            }
        })
}

/// Push channel always, email when enabled.
///
/// # Errors
///
/// Fails when the email client cannot be built.
pub fn notifier(config: &NotificationConfig) -> anyhow::Result<Arc<dyn PaymentNotifier>> {
    let mut composite = CompositeNotifier::new(vec![Arc::new(LogPushNotifier::new())]);

    if config.email_enabled {
        if let Some(key) = &config.resend_api_key {
            let mut resend = ResendConfig::new(key.clone(), config.from_header());
            if let Some(url) = &config.api_base_url {
                resend = resend.with_base_url(url.clone());
            }
            let email = ResendEmailNotifier::new(resend).context("building email client")?;
            composite = composite.with_channel(Arc::new(email));
        }
    }

    Ok(Arc::new(composite))
}

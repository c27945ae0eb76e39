//! Email channel backed by the Resend HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::ports::{NotificationError, NotificationKind, PaymentNotification, PaymentNotifier};

/// Resend sender configuration.
#[derive(Clone)]
pub struct ResendConfig {
    api_key: SecretString,
    from: String,
    api_base_url: String,
    timeout: Duration,
}

impl ResendConfig {
    /// `from` is the formatted sender, e.g. `Storefront <noreply@example.com>`.
    pub fn new(api_key: SecretString, from: impl Into<String>) -> Self {
        Self {
            api_key,
            from: from.into(),
            api_base_url: "https://api.resend.com".to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Sends payment emails through Resend.
pub struct ResendEmailNotifier {
    config: ResendConfig,
    http_client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct EmailBody<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: String,
    html: String,
}

impl ResendEmailNotifier {
    pub fn new(config: ResendConfig) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            config,
            http_client,
        })
    }
}

fn subject(notification: &PaymentNotification) -> String {
    let reference = &notification.reference_number;
    match notification.kind {
        NotificationKind::Succeeded => format!("Pago confirmado - {}", reference),
        NotificationKind::Failed => format!("Problema con tu pago - {}", reference),
        NotificationKind::Refunded => format!("Reembolso procesado - {}", reference),
    }
}

fn html(notification: &PaymentNotification) -> String {
    let amount = format!("{:.2} {}", notification.amount, notification.currency);
    match notification.kind {
        NotificationKind::Succeeded => format!(
            "<p>Recibimos tu pago de <strong>{}</strong>.</p><p>Referencia: {}</p>",
            amount, notification.reference_number
        ),
        NotificationKind::Failed => format!(
            "<p>No pudimos procesar tu pago de <strong>{}</strong>.</p><p>Motivo: {}</p><p>Referencia: {}</p>",
            amount,
            notification.error_message.as_deref().unwrap_or("Pago rechazado"),
            notification.reference_number
        ),
        NotificationKind::Refunded => format!(
            "<p>Reembolsamos <strong>{}</strong>.</p><p>Referencia: {}</p>",
            amount, notification.reference_number
        ),
    }
}

#[async_trait]
impl PaymentNotifier for ResendEmailNotifier {
    async fn notify(&self, notification: &PaymentNotification) -> Result<(), NotificationError> {
        let to = notification
            .email
            .as_deref()
            .filter(|email| email.contains('@'))
            .ok_or(NotificationError::MissingRecipient("email"))?;

        let body = EmailBody {
            from: &self.config.from,
            to: [to],
            subject: subject(notification),
            html: html(notification),
        };

        let response = self
            .http_client
            .post(format!("{}/emails", self.config.api_base_url))
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| NotificationError::Delivery(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotificationError::Delivery(format!(
                "Resend returned HTTP {}",
                response.status().as_u16()
            )));
        }

        tracing::info!(
            payment_id = %notification.payment_id,
            kind = notification.kind.as_str(),
            "Payment email sent"
        );
        Ok(())
    }
}

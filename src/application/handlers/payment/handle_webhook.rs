//! HandleWebhookHandler - Command handler for gateway webhook deliveries.
//!
//! Verification happens before anything is read or written. Verified
//! payloads are normalized by the provider's gateway into a canonical event
//! and reconciled through the shared transition service.

use std::collections::HashMap;
use std::sync::Arc;

use secrecy::SecretString;
use serde_json::Value;
use tracing::{Instrument, Span};

use crate::domain::foundation::{PaymentId, Timestamp};
use crate::domain::payment::{
    CanonicalEvent, NormalizedWebhook, PaymentError, PaymentOutcome, PaymentProvider,
    PaymentStatus, SignatureScheme, Transition, WebhookError, WebhookVerifier,
};
use crate::ports::{GatewayRegistry, PaymentRepository};

use super::PaymentTransitions;

/// Command carrying one raw webhook delivery.
#[derive(Debug, Clone)]
pub struct HandleWebhookCommand {
    pub provider: PaymentProvider,
    /// Raw request body, exactly as received.
    pub payload: Vec<u8>,
    /// Provider signature header (`x-culqi-signature`, `x-signature`,
    /// `stripe-signature`).
    pub signature: Option<String>,
    /// MercadoPago `x-request-id` header.
    pub request_id: Option<String>,
    pub received_at: Timestamp,
}

/// What the endpoint reports back to the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookOutcome {
    pub message: String,
    pub event_id: Option<String>,
    pub event_type: Option<String>,
    pub payment_id: Option<PaymentId>,
    pub status: Option<PaymentStatus>,
}

impl WebhookOutcome {
    fn ignored(event: Option<&CanonicalEvent>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            event_id: event.and_then(|e| e.event_id.clone()),
            event_type: event.map(|e| e.event_type.clone()),
            payment_id: None,
            status: None,
        }
    }
}

/// Per-provider signing secrets.
///
/// A provider without a secret has signature checks skipped; startup logs
/// that state once.
#[derive(Default)]
pub struct WebhookVerifiers {
    verifiers: HashMap<PaymentProvider, WebhookVerifier>,
}

impl WebhookVerifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, provider: PaymentProvider, secret: SecretString) -> Self {
        self.verifiers.insert(provider, WebhookVerifier::new(secret));
        self
    }

    pub fn is_enforced(&self, provider: PaymentProvider) -> bool {
        self.verifiers.contains_key(&provider)
    }

    /// Authenticates a delivery under the provider's scheme.
    ///
    /// # Errors
    ///
    /// - `MissingSignature` when a configured provider sent no header
    /// - `InvalidSignature` when the digest does not match
    /// - `TimestampOutOfRange` for Stripe deliveries outside the replay window
    /// - `ParseError` when the header or the MercadoPago body is malformed
    pub fn verify(&self, cmd: &HandleWebhookCommand) -> Result<(), WebhookError> {
        let Some(verifier) = self.verifiers.get(&cmd.provider) else {
            tracing::debug!(provider = %cmd.provider, "Webhook signature check skipped");
            return Ok(());
        };

        match SignatureScheme::for_provider(cmd.provider) {
            SignatureScheme::Body => {
                let signature = header(&cmd.signature, "x-culqi-signature")?;
                verifier.verify_body(&cmd.payload, signature)
            }
            SignatureScheme::Manifest => {
                let signature = header(&cmd.signature, "x-signature")?;
                let request_id = header(&cmd.request_id, "x-request-id")?;
                let data_id = notification_data_id(&parse_payload(&cmd.payload)?)?;
                verifier.verify_manifest(&data_id, request_id, signature)
            }
            SignatureScheme::Timestamped => {
                let signature = header(&cmd.signature, "stripe-signature")?;
                verifier.verify_timestamped(&cmd.payload, signature, cmd.received_at.as_unix_secs())
            }
        }
    }
}

fn header<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, WebhookError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(WebhookError::MissingSignature(name))
}

fn parse_payload(payload: &[u8]) -> Result<Value, WebhookError> {
    serde_json::from_slice(payload)
        .map_err(|e| WebhookError::ParseError(format!("invalid JSON payload: {}", e)))
}

/// MercadoPago signs `data.id`, which arrives as a string or a number.
fn notification_data_id(payload: &Value) -> Result<String, WebhookError> {
    match payload.pointer("/data/id") {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        _ => Err(WebhookError::ParseError("missing data.id".to_string())),
    }
}

/// Handler for webhook deliveries.
pub struct HandleWebhookHandler {
    payments: Arc<dyn PaymentRepository>,
    gateways: GatewayRegistry,
    verifiers: Arc<WebhookVerifiers>,
    transitions: PaymentTransitions,
    span: Span,
}

impl HandleWebhookHandler {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        gateways: GatewayRegistry,
        verifiers: Arc<WebhookVerifiers>,
        transitions: PaymentTransitions,
    ) -> Self {
        Self {
            payments,
            gateways,
            verifiers,
            transitions,
            span: tracing::info_span!("payment_webhook"),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Verifies and reconciles one delivery.
    ///
    /// Every authentic, well-formed delivery yields `Ok`, including events
    /// for unknown payments and events with nothing to change.
    ///
    /// # Errors
    ///
    /// - `Authentication` when the signature is missing, wrong or stale
    /// - `ValidationFailed` when the body is not JSON or the provider is not
    ///   configured
    /// - `Internal` when the gateway lookup or storage fails, so the gateway
    ///   retries the delivery
    pub async fn handle(&self, cmd: HandleWebhookCommand) -> Result<WebhookOutcome, PaymentError> {
        let span = tracing::info_span!(parent: &self.span, "webhook", provider = %cmd.provider);
        self.process(cmd).instrument(span).await
    }

    async fn process(&self, cmd: HandleWebhookCommand) -> Result<WebhookOutcome, PaymentError> {
        // 1. Authenticate before touching any state
        if let Err(e) = self.verifiers.verify(&cmd) {
            tracing::warn!(error = %e, "Webhook rejected");
            return Err(e.into());
        }

        let payload = parse_payload(&cmd.payload)?;
        let gateway = self.gateways.get(cmd.provider)?;

        // 2. Reduce to a canonical event
        let event = match gateway.normalize_webhook(&payload).await {
            Ok(NormalizedWebhook::Event(event)) => event,
            Ok(NormalizedWebhook::Ignored {
                event_id,
                event_type,
                reason,
            }) => {
                tracing::info!(event_type = %event_type, reason = %reason, "Webhook ignored");
                return Ok(WebhookOutcome {
                    message: reason,
                    event_id,
                    event_type: Some(event_type),
                    payment_id: None,
                    status: None,
                });
            }
            Err(e) => {
                tracing::error!(error = %e, "Webhook normalization failed");
                return Err(PaymentError::internal(format!(
                    "Could not resolve webhook event: {}",
                    e
                )));
            }
        };

        tracing::info!(
            event_type = %event.event_type,
            external_id = %event.external_id,
            category = %event.category,
            "Webhook received"
        );

        // 3. Correlate by gateway transaction id
        let Some(payment) = self
            .payments
            .find_by_external_id(event.provider, &event.external_id)
            .await?
        else {
            tracing::info!(external_id = %event.external_id, "Payment not found, event ignored");
            return Ok(WebhookOutcome::ignored(
                Some(&event),
                "Payment not found, event ignored",
            ));
        };

        // 4. Apply through the shared transition
        let target = event.category.target_status();
        let outcome = PaymentOutcome {
            external_id: Some(event.external_id.clone()),
            error_message: event.error_message.clone(),
            ..Default::default()
        };

        let applied = match self
            .transitions
            .apply(payment, target, outcome, cmd.received_at)
            .await
        {
            Ok(applied) => applied,
            Err(PaymentError::InvalidState(reason)) => {
                tracing::warn!(reason = %reason, "Webhook outcome not applicable");
                return Ok(WebhookOutcome::ignored(
                    Some(&event),
                    format!("Event ignored: {}", reason),
                ));
            }
            Err(e) => return Err(e),
        };

        let message = match applied.transition {
            Transition::Applied { from } => {
                format!("Payment updated from {} to {}", from, applied.payment.status)
            }
            Transition::AlreadyApplied => format!("Payment already {}", applied.payment.status),
            Transition::Absorbed { current } => {
                format!("Payment already {}, event ignored", current)
            }
        };

        Ok(WebhookOutcome {
            message,
            event_id: event.event_id,
            event_type: Some(event.event_type),
            payment_id: Some(applied.payment.id),
            status: Some(applied.payment.status),
        })
    }
}

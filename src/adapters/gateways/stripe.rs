//! Stripe payment-intent gateway adapter.
//!
//! Form-encoded API with basic authentication (secret key as username).
//! Amounts travel in the currency's minor unit. Each charge confirms the
//! intent immediately; intents needing 3-D Secure come back as
//! `requires_action` and settle later through webhooks.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::domain::payment::{CanonicalEvent, EventCategory, NormalizedWebhook, PaymentProvider};
use crate::ports::{
    ChargeRequest, ChargeResult, GatewayError, PaymentGateway, ProviderStatus, RefundRequest,
    RefundResult,
};

use super::http::{build_client, idempotency_key, read_json, str_at, USER_AGENT};

const PROVIDER: PaymentProvider = PaymentProvider::Stripe;

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com/v1).
    api_base_url: String,

    timeout: Duration,
}

impl StripeConfig {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            api_base_url: "https://api.stripe.com/v1".to_string(),
            timeout: Duration::from_secs(20),
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

/// Stripe gateway adapter.
pub struct StripeGateway {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripeGateway {
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built.
    pub fn new(config: StripeConfig) -> Result<Self, reqwest::Error> {
        let http_client = build_client(config.timeout, USER_AGENT)?;
        Ok(Self {
            config,
            http_client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }
}

/// Builds the `POST /payment_intents` form.
fn charge_params(request: &ChargeRequest) -> Result<Vec<(&'static str, String)>, GatewayError> {
    let amount = request
        .amount
        .to_minor_units()
        .map_err(|e| GatewayError::invalid_amount(PROVIDER, e))?;

    let mut params = vec![
        ("amount", amount.to_string()),
        ("currency", request.amount.currency().to_lowercase()),
        ("payment_method", request.token.clone()),
        ("confirm", "true".to_string()),
        ("description", request.description.clone()),
        ("receipt_email", request.email.clone()),
        ("metadata[order_id]", request.order_id.to_string()),
        ("metadata[reference]", request.reference.clone()),
        ("expand[]", "latest_charge".to_string()),
    ];
    if let Some(return_url) = &request.return_url {
        params.push(("return_url", return_url.clone()));
    }
    Ok(params)
}

/// Builds the `POST /refunds` form.
fn refund_params(request: &RefundRequest) -> Result<Vec<(&'static str, String)>, GatewayError> {
    let amount = request
        .amount
        .to_minor_units()
        .map_err(|e| GatewayError::invalid_amount(PROVIDER, e))?;

    let mut params = vec![
        ("payment_intent", request.external_id.clone()),
        ("amount", amount.to_string()),
        ("reason", "requested_by_customer".to_string()),
    ];
    if let Some(reason) = &request.reason {
        params.push(("metadata[reason]", reason.clone()));
    }
    Ok(params)
}

fn error_message(body: &Value) -> Option<String> {
    str_at(body, "/error/message")
}

/// Card details from the expanded latest charge, or the legacy charges list.
fn card_details(body: &Value) -> Option<&Value> {
    body.pointer("/latest_charge/payment_method_details/card")
        .or_else(|| body.pointer("/charges/data/0/payment_method_details/card"))
}

fn card_mask(body: &Value) -> Option<String> {
    card_details(body)
        .and_then(|card| str_at(card, "/last4"))
        .map(|last4| format!("****{}", last4))
}

fn card_brand(body: &Value) -> Option<String> {
    card_details(body).and_then(|card| str_at(card, "/brand"))
}

fn intent_fields(body: &Value) -> Result<(String, String), GatewayError> {
    let id = str_at(body, "/id").ok_or_else(|| {
        GatewayError::invalid_response(PROVIDER, "Stripe response without id")
    })?;
    let status = str_at(body, "/status").ok_or_else(|| {
        GatewayError::invalid_response(PROVIDER, "Stripe response without status")
    })?;
    Ok((id, status))
}

/// Maps a Stripe webhook payload to a canonical event.
pub(crate) fn normalize(payload: &Value) -> Result<NormalizedWebhook, GatewayError> {
    let event_type = str_at(payload, "/type").ok_or_else(|| {
        GatewayError::invalid_response(PROVIDER, "Stripe event without a type")
    })?;
    let event_id = str_at(payload, "/id");
    let object = payload.pointer("/data/object").cloned().unwrap_or(Value::Null);
    let object_type = str_at(&object, "/object").unwrap_or_default();

    let external_id = match object_type.as_str() {
        "payment_intent" => str_at(&object, "/id"),
        "charge" => str_at(&object, "/payment_intent").or_else(|| str_at(&object, "/id")),
        _ => {
            return Ok(NormalizedWebhook::Ignored {
                event_id,
                event_type,
                reason: format!("Event object {} ignored", object_type),
            })
        }
    }
    .ok_or_else(|| GatewayError::invalid_response(PROVIDER, "Stripe event object without id"))?;

    let category = match event_type.as_str() {
        "payment_intent.succeeded" | "charge.succeeded" => EventCategory::Succeeded,
        "payment_intent.payment_failed" => EventCategory::Failed,
        "charge.refunded" => EventCategory::Refunded,
        _ => {
            return Ok(NormalizedWebhook::Ignored {
                event_id,
                event_type,
                reason: "Unhandled Stripe event type".to_string(),
            })
        }
    };

    let error_message = match category {
        EventCategory::Failed => str_at(&object, "/last_payment_error/message")
            .or_else(|| Some("Payment failed".to_string())),
        _ => None,
    };

    Ok(NormalizedWebhook::Event(CanonicalEvent {
        provider: PROVIDER,
        external_id,
        category,
        event_id,
        event_type,
        error_message,
        raw: payload.clone(),
    }))
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    fn provider(&self) -> PaymentProvider {
        PROVIDER
    }

    async fn charge(&self, request: ChargeRequest) -> Result<ChargeResult, GatewayError> {
        let params = charge_params(&request)?;
        tracing::info!(reference = %request.reference, "Creating Stripe PaymentIntent");

        let response = self
            .http_client
            .post(self.url("/payment_intents"))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .header("Idempotency-Key", idempotency_key())
            .form(&params)
            .send()
            .await
            .map_err(|e| GatewayError::network(PROVIDER, e))?;

        let body = read_json(PROVIDER, response, error_message, "Payment failed").await?;
        let (external_id, status) = intent_fields(&body)?;

        if !self.is_approved(&status)
            && !self.is_pending(&status)
            && !self.requires_additional_action(&status)
        {
            return Err(GatewayError::declined(
                PROVIDER,
                format!("Payment failed with status: {}", status),
            )
            .with_provider_code(status));
        }
        if self.requires_additional_action(&status) {
            tracing::warn!(external_id = %external_id, "Stripe PaymentIntent requires additional action");
        }

        tracing::info!(external_id = %external_id, status = %status, "Stripe PaymentIntent created");
        Ok(ChargeResult {
            external_id,
            status,
            card_mask: card_mask(&body),
            card_brand: card_brand(&body),
            raw: body,
        })
    }

    async fn refund(&self, request: RefundRequest) -> Result<RefundResult, GatewayError> {
        let params = refund_params(&request)?;
        tracing::info!(external_id = %request.external_id, "Creating Stripe refund");

        let response = self
            .http_client
            .post(self.url("/refunds"))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .header("Idempotency-Key", &request.idempotency_key)
            .form(&params)
            .send()
            .await
            .map_err(|e| GatewayError::network(PROVIDER, e))?;

        let body = read_json(PROVIDER, response, error_message, "Refund failed").await?;
        let (refund_id, status) = intent_fields(&body)?;

        if status == "failed" || status == "canceled" {
            return Err(GatewayError::declined(
                PROVIDER,
                format!("Refund failed with status: {}", status),
            ));
        }

        Ok(RefundResult {
            refund_id,
            status,
            raw: body,
        })
    }

    async fn get_status(&self, external_id: &str) -> Result<ProviderStatus, GatewayError> {
        let response = self
            .http_client
            .get(self.url(&format!("/payment_intents/{}", external_id)))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .query(&[("expand[]", "latest_charge")])
            .send()
            .await
            .map_err(|e| GatewayError::network(PROVIDER, e))?;

        let body = read_json(PROVIDER, response, error_message, "PaymentIntent not found").await?;
        let (_, status) = intent_fields(&body)?;

        Ok(ProviderStatus {
            external_id: external_id.to_string(),
            detail: str_at(&body, "/last_payment_error/message"),
            card_mask: card_mask(&body),
            card_brand: card_brand(&body),
            status,
            raw: body,
        })
    }

    async fn normalize_webhook(&self, payload: &Value) -> Result<NormalizedWebhook, GatewayError> {
        normalize(payload)
    }

    fn is_approved(&self, status: &str) -> bool {
        status == "succeeded"
    }

    fn is_pending(&self, status: &str) -> bool {
        status == "processing"
    }

    fn requires_additional_action(&self, status: &str) -> bool {
        status == "requires_action" || status == "requires_confirmation"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Money, OrderId};
    use crate::domain::payment::{PaymentMethod, PaymentStatus};
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn gateway() -> StripeGateway {
        StripeGateway::new(StripeConfig::new(SecretString::new("sk_test".to_string()))).unwrap()
    }

    fn param<'a>(params: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    // ══════════════════════════════════════════════════════════════
    // Wire Format
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn charge_params_send_cents_and_lowercase_currency() {
        let request = ChargeRequest {
            amount: Money::new(dec!(118.00), "USD").unwrap(),
            token: "pm_card_visa".to_string(),
            method: PaymentMethod::Card,
            email: "buyer@example.com".to_string(),
            description: "Order ORD-1".to_string(),
            reference: "PAY-20240115-0003".to_string(),
            order_id: OrderId::new(),
            installments: None,
            payment_method_id: None,
            identification: None,
            return_url: Some("https://shop.example.com/return".to_string()),
        };

        let params = charge_params(&request).unwrap();

        assert_eq!(param(&params, "amount"), Some("11800"));
        assert_eq!(param(&params, "currency"), Some("usd"));
        assert_eq!(param(&params, "confirm"), Some("true"));
        assert_eq!(param(&params, "payment_method"), Some("pm_card_visa"));
        assert_eq!(param(&params, "metadata[reference]"), Some("PAY-20240115-0003"));
        assert_eq!(param(&params, "return_url"), Some("https://shop.example.com/return"));
    }

    #[test]
    fn refund_params_send_minor_units() {
        let params = refund_params(&RefundRequest {
            external_id: "pi_1".to_string(),
            amount: Money::new(dec!(50.00), "USD").unwrap(),
            full: false,
            reason: Some("damaged".to_string()),
            idempotency_key: "refund-1".to_string(),
        })
        .unwrap();

        assert_eq!(param(&params, "payment_intent"), Some("pi_1"));
        assert_eq!(param(&params, "amount"), Some("5000"));
        assert_eq!(param(&params, "reason"), Some("requested_by_customer"));
        assert_eq!(param(&params, "metadata[reason]"), Some("damaged"));
    }

    #[test]
    fn card_details_prefer_latest_charge() {
        let body = json!({
            "latest_charge": {"payment_method_details": {"card": {"last4": "4242", "brand": "visa"}}},
            "charges": {"data": [{"payment_method_details": {"card": {"last4": "0000", "brand": "amex"}}}]}
        });
        assert_eq!(card_mask(&body).as_deref(), Some("****4242"));
        assert_eq!(card_brand(&body).as_deref(), Some("visa"));

        let legacy = json!({
            "charges": {"data": [{"payment_method_details": {"card": {"last4": "0005", "brand": "amex"}}}]}
        });
        assert_eq!(card_mask(&legacy).as_deref(), Some("****0005"));
    }

    // ══════════════════════════════════════════════════════════════
    // Classification
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn classifies_stripe_statuses() {
        let gateway = gateway();
        assert_eq!(gateway.classify("succeeded"), PaymentStatus::Completed);
        assert_eq!(gateway.classify("processing"), PaymentStatus::Pending);
        assert_eq!(gateway.classify("requires_action"), PaymentStatus::Pending);
        assert_eq!(gateway.classify("requires_confirmation"), PaymentStatus::Pending);
        assert_eq!(gateway.classify("requires_payment_method"), PaymentStatus::Failed);
    }

    // ══════════════════════════════════════════════════════════════
    // Webhook Normalization
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn payment_intent_event_uses_object_id() {
        let payload = json!({
            "id": "evt_1",
            "type": "payment_intent.succeeded",
            "data": {"object": {"object": "payment_intent", "id": "pi_1"}}
        });

        let NormalizedWebhook::Event(event) = normalize(&payload).unwrap() else {
            panic!("expected event");
        };
        assert_eq!(event.external_id, "pi_1");
        assert_eq!(event.category, EventCategory::Succeeded);
        assert_eq!(event.event_id.as_deref(), Some("evt_1"));
    }

    #[test]
    fn charge_event_correlates_by_payment_intent() {
        let payload = json!({
            "id": "evt_2",
            "type": "charge.refunded",
            "data": {"object": {"object": "charge", "id": "ch_1", "payment_intent": "pi_1"}}
        });

        let NormalizedWebhook::Event(event) = normalize(&payload).unwrap() else {
            panic!("expected event");
        };
        assert_eq!(event.external_id, "pi_1");
        assert_eq!(event.category, EventCategory::Refunded);
    }

    #[test]
    fn failed_intent_carries_last_error() {
        let payload = json!({
            "type": "payment_intent.payment_failed",
            "data": {"object": {
                "object": "payment_intent",
                "id": "pi_1",
                "last_payment_error": {"message": "Your card was declined."}
            }}
        });

        let NormalizedWebhook::Event(event) = normalize(&payload).unwrap() else {
            panic!("expected event");
        };
        assert_eq!(event.error_message.as_deref(), Some("Your card was declined."));
    }

    #[test]
    fn other_objects_are_ignored() {
        let payload = json!({
            "type": "customer.created",
            "data": {"object": {"object": "customer", "id": "cus_1"}}
        });

        assert!(matches!(
            normalize(&payload).unwrap(),
            NormalizedWebhook::Ignored { .. }
        ));
    }

    #[test]
    fn unhandled_intent_events_are_ignored() {
        let payload = json!({
            "type": "payment_intent.created",
            "data": {"object": {"object": "payment_intent", "id": "pi_1"}}
        });

        assert!(matches!(
            normalize(&payload).unwrap(),
            NormalizedWebhook::Ignored { .. }
        ));
    }
}

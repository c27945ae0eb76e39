//! Culqi card-charge gateway adapter.
//!
//! JSON API with bearer authentication. Amounts travel in céntimos.
//!
//! # Configuration
//!
//! ```ignore
//! let config = CulqiConfig::new(api_key).with_timeout(Duration::from_secs(20));
//! let gateway = CulqiGateway::new(config)?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

use crate::domain::payment::{
    CanonicalEvent, EventCategory, NormalizedWebhook, PaymentProvider,
};
use crate::ports::{
    ChargeRequest, ChargeResult, GatewayError, PaymentGateway, ProviderStatus, RefundRequest,
    RefundResult,
};

use super::http::{build_client, read_json, str_at, USER_AGENT};

const PROVIDER: PaymentProvider = PaymentProvider::Culqi;

/// Outcome type Culqi reports for a captured charge.
const SUCCESSFUL_SALE: &str = "venta_exitosa";

/// Status used when Culqi asks for 3-D Secure authentication.
const REVIEW: &str = "review";

/// Culqi API configuration.
#[derive(Clone)]
pub struct CulqiConfig {
    /// Secret key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL (default: https://api.culqi.com/v2).
    api_base_url: String,

    timeout: Duration,
}

impl CulqiConfig {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            api_base_url: "https://api.culqi.com/v2".to_string(),
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

/// Culqi gateway adapter.
pub struct CulqiGateway {
    config: CulqiConfig,
    http_client: reqwest::Client,
}

impl CulqiGateway {
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built.
    pub fn new(config: CulqiConfig) -> Result<Self, reqwest::Error> {
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

/// Builds the `POST /charges` body.
fn charge_body(request: &ChargeRequest) -> Result<Value, GatewayError> {
    let amount = request
        .amount
        .to_minor_units()
        .map_err(|e| GatewayError::invalid_amount(PROVIDER, e))?;

    Ok(json!({
        "amount": amount,
        "currency_code": request.amount.currency(),
        "email": request.email,
        "source_id": request.token,
        "description": request.description,
        "metadata": {
            "order_id": request.order_id.to_string(),
            "reference": request.reference,
        },
    }))
}

/// Builds the `POST /refunds` body.
fn refund_body(request: &RefundRequest) -> Result<Value, GatewayError> {
    let amount = request
        .amount
        .to_minor_units()
        .map_err(|e| GatewayError::invalid_amount(PROVIDER, e))?;

    Ok(json!({
        "charge_id": request.external_id,
        "amount": amount,
        "reason": request.reason.as_deref().unwrap_or("solicitud_comprador"),
    }))
}

fn error_message(body: &Value) -> Option<String> {
    str_at(body, "/user_message").or_else(|| str_at(body, "/merchant_message"))
}

/// Reads the charge status; a 3-D Secure challenge has no outcome yet.
fn charge_status(body: &Value) -> String {
    if str_at(body, "/action_code").as_deref() == Some("REVIEW") {
        return REVIEW.to_string();
    }
    str_at(body, "/outcome/type").unwrap_or_else(|| SUCCESSFUL_SALE.to_string())
}

fn card_mask(body: &Value) -> Option<String> {
    str_at(body, "/source/card_number")
}

fn card_brand(body: &Value) -> Option<String> {
    str_at(body, "/source/card_brand").or_else(|| str_at(body, "/source/iin/card_brand"))
}

/// Culqi sometimes delivers `data` as a JSON-encoded string.
fn event_object(payload: &Value) -> Option<Value> {
    match payload.get("data")? {
        Value::String(encoded) => serde_json::from_str::<Value>(encoded)
            .ok()
            .map(|data| data.get("object").cloned().unwrap_or(data)),
        data => data.get("object").cloned(),
    }
}

/// Maps a Culqi webhook payload to a canonical event.
pub(crate) fn normalize(payload: &Value) -> Result<NormalizedWebhook, GatewayError> {
    let event_type = str_at(payload, "/type").ok_or_else(|| {
        GatewayError::invalid_response(PROVIDER, "Culqi webhook without a type")
    })?;
    let event_id = str_at(payload, "/id");

    let category = match event_type.as_str() {
        "charge.creation.succeeded" => EventCategory::Succeeded,
        "charge.creation.failed" => EventCategory::Failed,
        "refund.creation.succeeded" => EventCategory::Refunded,
        _ => {
            return Ok(NormalizedWebhook::Ignored {
                event_id,
                event_type,
                reason: "Unhandled Culqi event type".to_string(),
            })
        }
    };

    let object = event_object(payload).unwrap_or(Value::Null);
    let external_id = str_at(&object, "/charge_id")
        .or_else(|| str_at(&object, "/id"))
        .ok_or_else(|| {
            GatewayError::invalid_response(PROVIDER, "Culqi webhook without a charge id")
        })?;

    let error_message = match category {
        EventCategory::Failed => str_at(&object, "/outcome/user_message")
            .or_else(|| str_at(&object, "/outcome/code"))
            .or_else(|| Some("Unknown error".to_string())),
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
impl PaymentGateway for CulqiGateway {
    fn provider(&self) -> PaymentProvider {
        PROVIDER
    }

    async fn charge(&self, request: ChargeRequest) -> Result<ChargeResult, GatewayError> {
        let body = charge_body(&request)?;
        tracing::info!(reference = %request.reference, "Creating Culqi charge");

        let response = self
            .http_client
            .post(self.url("/charges"))
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::network(PROVIDER, e))?;

        let body = read_json(PROVIDER, response, error_message, "Payment failed").await?;
        let external_id = str_at(&body, "/id").ok_or_else(|| {
            GatewayError::invalid_response(PROVIDER, "Culqi charge response without id")
        })?;

        tracing::info!(external_id = %external_id, "Culqi charge created");
        Ok(ChargeResult {
            external_id,
            status: charge_status(&body),
            card_mask: card_mask(&body),
            card_brand: card_brand(&body),
            raw: body,
        })
    }

    async fn refund(&self, request: RefundRequest) -> Result<RefundResult, GatewayError> {
        let body = refund_body(&request)?;
        tracing::info!(external_id = %request.external_id, "Creating Culqi refund");

        let response = self
            .http_client
            .post(self.url("/refunds"))
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::network(PROVIDER, e))?;

        let body = read_json(PROVIDER, response, error_message, "Refund failed").await?;
        let refund_id = str_at(&body, "/id").ok_or_else(|| {
            GatewayError::invalid_response(PROVIDER, "Culqi refund response without id")
        })?;

        Ok(RefundResult {
            refund_id,
            status: "succeeded".to_string(),
            raw: body,
        })
    }

    async fn get_status(&self, external_id: &str) -> Result<ProviderStatus, GatewayError> {
        let response = self
            .http_client
            .get(self.url(&format!("/charges/{}", external_id)))
            .bearer_auth(self.config.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| GatewayError::network(PROVIDER, e))?;

        let body = read_json(PROVIDER, response, error_message, "Charge not found").await?;

        Ok(ProviderStatus {
            external_id: external_id.to_string(),
            status: charge_status(&body),
            detail: str_at(&body, "/outcome/user_message"),
            card_mask: card_mask(&body),
            card_brand: card_brand(&body),
            raw: body,
        })
    }

    async fn normalize_webhook(&self, payload: &Value) -> Result<NormalizedWebhook, GatewayError> {
        normalize(payload)
    }

    fn is_approved(&self, status: &str) -> bool {
        status == SUCCESSFUL_SALE
    }

    fn is_pending(&self, _status: &str) -> bool {
        false
    }

    fn requires_additional_action(&self, status: &str) -> bool {
        status == REVIEW
    }
}

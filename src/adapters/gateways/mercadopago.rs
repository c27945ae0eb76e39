//! MercadoPago IPN-style gateway adapter.
//!
//! The payments API takes decimal major units. The adapter derives them from
//! the rounded minor-unit value so rounding matches the cent-based gateways.
//! IPN notifications only carry the payment id, so webhook normalization
//! fetches the live payment status.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

use crate::domain::foundation::Money;
use crate::domain::payment::{CanonicalEvent, EventCategory, NormalizedWebhook, PaymentProvider};
use crate::ports::{
    ChargeRequest, ChargeResult, GatewayError, PaymentGateway, ProviderStatus, RefundRequest,
    RefundResult,
};

use super::http::{build_client, idempotency_key, read_json, str_at, USER_AGENT};

const PROVIDER: PaymentProvider = PaymentProvider::MercadoPago;

const PENDING_STATUSES: [&str; 3] = ["pending", "in_process", "authorized"];

/// Customer-facing messages for `cc_rejected_*` status details.
const REJECTION_MESSAGES: [(&str, &str); 13] = [
    ("cc_rejected_bad_filled_card_number", "Invalid card number"),
    ("cc_rejected_bad_filled_date", "Invalid expiration date"),
    ("cc_rejected_bad_filled_other", "Invalid card data"),
    ("cc_rejected_bad_filled_security_code", "Invalid security code"),
    ("cc_rejected_blacklist", "Card not allowed"),
    ("cc_rejected_call_for_authorize", "Call to authorize payment"),
    ("cc_rejected_card_disabled", "Card disabled"),
    ("cc_rejected_duplicated_payment", "Duplicated payment"),
    ("cc_rejected_high_risk", "Payment rejected by fraud prevention"),
    ("cc_rejected_insufficient_amount", "Insufficient funds"),
    ("cc_rejected_invalid_installments", "Invalid installments"),
    ("cc_rejected_max_attempts", "Maximum attempts exceeded"),
    ("cc_rejected_other_reason", "Payment rejected"),
];

/// MercadoPago API configuration.
#[derive(Clone)]
pub struct MercadoPagoConfig {
    /// Access token (APP_USR-... or TEST-...).
    access_token: SecretString,

    /// Base URL (default: https://api.mercadopago.com/v1).
    api_base_url: String,

    timeout: Duration,
}

impl MercadoPagoConfig {
    pub fn new(access_token: SecretString) -> Self {
        Self {
            access_token,
            api_base_url: "https://api.mercadopago.com/v1".to_string(),
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

/// MercadoPago gateway adapter.
pub struct MercadoPagoGateway {
    config: MercadoPagoConfig,
    http_client: reqwest::Client,
}

impl MercadoPagoGateway {
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built.
    pub fn new(config: MercadoPagoConfig) -> Result<Self, reqwest::Error> {
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

/// Maps a rejection detail to the message shown to the customer.
pub(crate) fn rejection_message(status_detail: Option<&str>) -> &'static str {
    status_detail
        .and_then(|detail| {
            REJECTION_MESSAGES
                .iter()
                .find(|(key, _)| *key == detail)
                .map(|(_, message)| *message)
        })
        .unwrap_or("Payment rejected")
}

/// Major-unit amount as a JSON number, rounded to the cent first.
fn major_units(amount: &Money) -> Result<Value, GatewayError> {
    let rounded = amount
        .rounded()
        .map_err(|e| GatewayError::invalid_amount(PROVIDER, e))?;
    // Parsed from the decimal text so the float is the nearest to the cent value
    rounded
        .to_string()
        .parse::<f64>()
        .map(|value| json!(value))
        .map_err(|_| GatewayError::invalid_response(PROVIDER, "Amount not representable"))
}

/// Builds the `POST /payments` body.
fn charge_body(request: &ChargeRequest) -> Result<Value, GatewayError> {
    let mut payer = json!({ "email": request.email });
    if let Some(identification) = &request.identification {
        payer["identification"] = json!({
            "type": identification.kind,
            "number": identification.number,
        });
    }

    let mut body = json!({
        "transaction_amount": major_units(&request.amount)?,
        "token": request.token,
        "description": request.description,
        "installments": request.installments.unwrap_or(1),
        "payer": payer,
        "external_reference": request.reference,
        "metadata": { "order_id": request.order_id.to_string() },
    });
    if let Some(method_id) = &request.payment_method_id {
        body["payment_method_id"] = json!(method_id);
    }
    Ok(body)
}

/// Builds the refund body; a full refund sends no amount.
fn refund_body(request: &RefundRequest) -> Result<Value, GatewayError> {
    if request.full {
        return Ok(json!({}));
    }
    Ok(json!({ "amount": major_units(&request.amount)? }))
}

fn error_message(body: &Value) -> Option<String> {
    str_at(body, "/message").or_else(|| {
        let causes: Vec<String> = body
            .get("cause")?
            .as_array()?
            .iter()
            .filter_map(|cause| str_at(cause, "/description"))
            .collect();
        (!causes.is_empty()).then(|| causes.join(", "))
    })
}

fn card_mask(body: &Value) -> Option<String> {
    let first = str_at(body, "/card/first_six_digits")?;
    let last = str_at(body, "/card/last_four_digits")?;
    Some(format!("{}...{}", first, last))
}

fn payment_id(body: &Value) -> Result<String, GatewayError> {
    str_at(body, "/id").ok_or_else(|| {
        GatewayError::invalid_response(PROVIDER, "MercadoPago response without payment id")
    })
}

fn status_of(body: &Value) -> Result<String, GatewayError> {
    str_at(body, "/status").ok_or_else(|| {
        GatewayError::invalid_response(PROVIDER, "MercadoPago response without status")
    })
}

/// Maps a live payment status to a webhook category.
fn category_for(status: &str) -> Option<EventCategory> {
    match status {
        "approved" => Some(EventCategory::Succeeded),
        "rejected" | "cancelled" => Some(EventCategory::Failed),
        "refunded" | "charged_back" => Some(EventCategory::Refunded),
        s if PENDING_STATUSES.contains(&s) => Some(EventCategory::Pending),
        _ => None,
    }
}

/// Maps an IPN notification to a canonical event.
///
/// The notification only names the payment, so the live status is looked up
/// through `gateway`.
pub(crate) async fn normalize<G>(
    gateway: &G,
    payload: &Value,
) -> Result<NormalizedWebhook, GatewayError>
where
    G: PaymentGateway + ?Sized,
{
    let notification_type = str_at(payload, "/type")
        .or_else(|| str_at(payload, "/topic"))
        .unwrap_or_default();
    let event_id = str_at(payload, "/id");

    if notification_type != "payment" {
        return Ok(NormalizedWebhook::Ignored {
            event_id,
            reason: format!("Event type {} ignored", notification_type),
            event_type: notification_type,
        });
    }

    let data_id = str_at(payload, "/data/id").ok_or_else(|| {
        GatewayError::invalid_response(PROVIDER, "MercadoPago notification without data.id")
    })?;

    let live = gateway.get_status(&data_id).await?;
    let event_type = format!("payment.{}", live.status);

    let Some(category) = category_for(&live.status) else {
        return Ok(NormalizedWebhook::Ignored {
            event_id: Some(data_id),
            event_type,
            reason: format!("Unhandled MercadoPago status: {}", live.status),
        });
    };

    let error_message = match category {
        EventCategory::Failed => live.detail.clone().or_else(|| Some(live.status.clone())),
        _ => None,
    };

    Ok(NormalizedWebhook::Event(CanonicalEvent {
        provider: PROVIDER,
        external_id: data_id,
        category,
        event_id: event_id.or_else(|| Some(live.external_id.clone())),
        event_type,
        error_message,
        raw: json!({ "notification": payload, "payment": live.raw }),
    }))
}

#[async_trait]
impl PaymentGateway for MercadoPagoGateway {
    fn provider(&self) -> PaymentProvider {
        PROVIDER
    }

    async fn charge(&self, request: ChargeRequest) -> Result<ChargeResult, GatewayError> {
        let body = charge_body(&request)?;
        tracing::info!(reference = %request.reference, "Creating MercadoPago payment");

        let response = self
            .http_client
            .post(self.url("/payments"))
            .bearer_auth(self.config.access_token.expose_secret())
            .header("X-Idempotency-Key", idempotency_key())
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::network(PROVIDER, e))?;

        let body = read_json(PROVIDER, response, error_message, "Payment failed").await?;
        let status = status_of(&body)?;

        if status == "rejected" {
            let detail = str_at(&body, "/status_detail");
            let err = GatewayError::declined(PROVIDER, rejection_message(detail.as_deref()));
            return Err(match detail {
                Some(detail) => err.with_provider_code(detail),
                None => err,
            });
        }

        let external_id = payment_id(&body)?;
        tracing::info!(external_id = %external_id, status = %status, "MercadoPago payment created");
        Ok(ChargeResult {
            external_id,
            status,
            card_mask: card_mask(&body),
            card_brand: str_at(&body, "/payment_method_id"),
            raw: body,
        })
    }

    async fn refund(&self, request: RefundRequest) -> Result<RefundResult, GatewayError> {
        let body = refund_body(&request)?;
        tracing::info!(external_id = %request.external_id, "Creating MercadoPago refund");

        let response = self
            .http_client
            .post(self.url(&format!("/payments/{}/refunds", request.external_id)))
            .bearer_auth(self.config.access_token.expose_secret())
            .header("X-Idempotency-Key", &request.idempotency_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::network(PROVIDER, e))?;

        let body = read_json(PROVIDER, response, error_message, "Refund failed").await?;

        Ok(RefundResult {
            refund_id: payment_id(&body)?,
            status: str_at(&body, "/status").unwrap_or_else(|| "approved".to_string()),
            raw: body,
        })
    }

    async fn get_status(&self, external_id: &str) -> Result<ProviderStatus, GatewayError> {
        let response = self
            .http_client
            .get(self.url(&format!("/payments/{}", external_id)))
            .bearer_auth(self.config.access_token.expose_secret())
            .send()
            .await
            .map_err(|e| GatewayError::network(PROVIDER, e))?;

        let body = read_json(PROVIDER, response, error_message, "Payment not found").await?;

        Ok(ProviderStatus {
            external_id: external_id.to_string(),
            status: status_of(&body)?,
            detail: str_at(&body, "/status_detail"),
            card_mask: card_mask(&body),
            card_brand: str_at(&body, "/payment_method_id"),
            raw: body,
        })
    }

    async fn normalize_webhook(&self, payload: &Value) -> Result<NormalizedWebhook, GatewayError> {
        normalize(self, payload).await
    }

    fn is_approved(&self, status: &str) -> bool {
        status == "approved"
    }

    fn is_pending(&self, status: &str) -> bool {
        PENDING_STATUSES.contains(&status)
    }

    fn requires_additional_action(&self, _status: &str) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::OrderId;
    use crate::domain::payment::{PaymentMethod, PaymentStatus};
    use crate::ports::PayerIdentification;
    use rust_decimal_macros::dec;

    fn gateway() -> MercadoPagoGateway {
        MercadoPagoGateway::new(MercadoPagoConfig::new(SecretString::new(
            "TEST-token".to_string(),
        )))
        .unwrap()
    }

    fn charge_request() -> ChargeRequest {
        ChargeRequest {
            amount: Money::new(dec!(33.335), "PEN").unwrap(),
            token: "card_token".to_string(),
            method: PaymentMethod::Card,
            email: "buyer@example.com".to_string(),
            description: "Order ORD-1".to_string(),
            reference: "PAY-20240115-0002".to_string(),
            order_id: OrderId::new(),
            installments: Some(3),
            payment_method_id: Some("visa".to_string()),
            identification: Some(PayerIdentification {
                kind: "DNI".to_string(),
                number: "12345678".to_string(),
            }),
            return_url: None,
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Wire Format
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn charge_body_uses_rounded_major_units() {
        let body = charge_body(&charge_request()).unwrap();

        assert_eq!(body["transaction_amount"], json!(33.34));
        assert_eq!(body["installments"], 3);
        assert_eq!(body["payment_method_id"], "visa");
        assert_eq!(body["payer"]["identification"]["type"], "DNI");
        assert_eq!(body["external_reference"], "PAY-20240115-0002");
    }

    #[test]
    fn full_refund_omits_amount() {
        let request = RefundRequest {
            external_id: "123".to_string(),
            amount: Money::new(dec!(100), "PEN").unwrap(),
            full: true,
            reason: None,
            idempotency_key: "refund-1".to_string(),
        };
        assert_eq!(refund_body(&request).unwrap(), json!({}));

        let partial = RefundRequest {
            full: false,
            amount: Money::new(dec!(50), "PEN").unwrap(),
            ..request
        };
        assert_eq!(refund_body(&partial).unwrap()["amount"], json!(50.0));
    }

    #[test]
    fn error_message_joins_causes() {
        let body = json!({"cause": [{"description": "invalid token"}, {"description": "bad payer"}]});
        assert_eq!(error_message(&body).as_deref(), Some("invalid token, bad payer"));
        assert_eq!(
            error_message(&json!({"message": "bad request"})).as_deref(),
            Some("bad request")
        );
        assert_eq!(error_message(&json!({"cause": []})), None);
    }

    #[test]
    fn card_mask_joins_first_six_and_last_four() {
        let body = json!({"card": {"first_six_digits": "450995", "last_four_digits": "3704"}});
        assert_eq!(card_mask(&body).as_deref(), Some("450995...3704"));
        assert_eq!(card_mask(&json!({})), None);
    }

    // ══════════════════════════════════════════════════════════════
    // Classification
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn rejection_messages_come_from_status_detail() {
        assert_eq!(
            rejection_message(Some("cc_rejected_insufficient_amount")),
            "Insufficient funds"
        );
        assert_eq!(
            rejection_message(Some("cc_rejected_high_risk")),
            "Payment rejected by fraud prevention"
        );
        assert_eq!(rejection_message(Some("something_new")), "Payment rejected");
        assert_eq!(rejection_message(None), "Payment rejected");
    }

    #[test]
    fn classifies_mercadopago_statuses() {
        let gateway = gateway();
        assert_eq!(gateway.classify("approved"), PaymentStatus::Completed);
        assert_eq!(gateway.classify("in_process"), PaymentStatus::Pending);
        assert_eq!(gateway.classify("authorized"), PaymentStatus::Pending);
        assert_eq!(gateway.classify("rejected"), PaymentStatus::Failed);
    }

    #[test]
    fn live_statuses_map_to_categories() {
        assert_eq!(category_for("approved"), Some(EventCategory::Succeeded));
        assert_eq!(category_for("cancelled"), Some(EventCategory::Failed));
        assert_eq!(category_for("charged_back"), Some(EventCategory::Refunded));
        assert_eq!(category_for("pending"), Some(EventCategory::Pending));
        assert_eq!(category_for("in_mediation"), None);
    }

    #[tokio::test]
    async fn non_payment_notifications_are_ignored_without_a_lookup() {
        let payload = json!({"id": 99, "type": "merchant_order", "data": {"id": "1"}});

        let normalized = gateway().normalize_webhook(&payload).await.unwrap();

        assert!(matches!(
            normalized,
            NormalizedWebhook::Ignored { ref event_type, .. } if event_type == "merchant_order"
        ));
    }
}

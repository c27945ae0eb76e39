//! Shared plumbing for gateway HTTP calls.

use std::time::Duration;

use reqwest::{Client, Response};
use serde_json::Value;

use crate::domain::payment::PaymentProvider;
use crate::ports::{GatewayError, GatewayErrorCode};

/// User agent sent on every gateway call.
pub(crate) const USER_AGENT: &str = concat!("storefront-payments/", env!("CARGO_PKG_VERSION"));

/// Builds the HTTP client every gateway adapter uses.
///
/// The timeout bounds the whole request, so a hung gateway cannot hold a
/// payment request open indefinitely. A client that cannot be built is an
/// error; there is no untimed fallback.
pub(crate) fn build_client(timeout: Duration, user_agent: &str) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
}

/// Reads a gateway response body as JSON.
///
/// Non-2xx responses become `GatewayError`s whose message comes from
/// `error_message`, falling back to `fallback`. 401/403 map to an
/// authentication error, 402 to a decline and 404 to not found.
pub(crate) async fn read_json(
    provider: PaymentProvider,
    response: Response,
    error_message: fn(&Value) -> Option<String>,
    fallback: &str,
) -> Result<Value, GatewayError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| GatewayError::network(provider, e))?;
    let body: Value = serde_json::from_str(&text).unwrap_or(Value::Null);

    if status.is_success() {
        if body.is_null() {
            return Err(GatewayError::invalid_response(
                provider,
                format!("{} returned a non-JSON body", provider),
            ));
        }
        return Ok(body);
    }

    let message = error_message(&body).unwrap_or_else(|| fallback.to_string());
    tracing::error!(
        provider = %provider,
        http_status = status.as_u16(),
        message = %message,
        "Gateway request failed"
    );

    let err = match status.as_u16() {
        401 | 403 => GatewayError::authentication(provider, message),
        402 => GatewayError::declined(provider, message),
        404 => GatewayError::new(provider, GatewayErrorCode::NotFound, message),
        _ => GatewayError::provider_error(provider, message),
    };
    Err(err)
}

/// String field at a JSON pointer, if present and non-empty.
pub(crate) fn str_at(value: &Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
}

/// Fresh idempotency key for one outbound call.
pub(crate) fn idempotency_key() -> String {
    uuid::Uuid::new_v4().to_string()
}

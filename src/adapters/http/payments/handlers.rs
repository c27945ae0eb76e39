//! HTTP handlers for payment endpoints.
//!
//! These handlers connect Axum routes to application layer command/query handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::application::handlers::payment::{
    CreatePaymentCommand, CreatePaymentHandler, GetPaymentHandler, GetPaymentQuery,
    HandleWebhookCommand, HandleWebhookHandler, ListOrderPaymentsHandler, ListOrderPaymentsQuery,
    ListPaymentsHandler, ListPaymentsQuery, PaymentTransitions, RefundPaymentCommand,
    RefundPaymentHandler, SyncPaymentStatusCommand, SyncPaymentStatusHandler, WebhookVerifiers,
};
use crate::domain::foundation::{OrderId, PaymentId, Timestamp};
use crate::domain::payment::{Payment, PaymentError, PaymentProvider};
use crate::ports::{GatewayRegistry, OrderRepository, PaymentRepository};

use crate::adapters::http::middleware::{RequireAdmin, RequireAuth};

use super::dto::{
    CreatePaymentRequest, ErrorResponse, HealthResponse, PaymentResponse, RefundPaymentRequest,
    WebhookResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// Cloned per request; every dependency is Arc-wrapped or cheap to clone.
#[derive(Clone)]
pub struct PaymentsAppState {
    pub orders: Arc<dyn OrderRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub gateways: GatewayRegistry,
    pub transitions: PaymentTransitions,
    pub verifiers: Arc<WebhookVerifiers>,
}

impl PaymentsAppState {
    /// Create handlers on demand from the shared state.
    pub fn create_payment_handler(&self) -> CreatePaymentHandler {
        CreatePaymentHandler::new(
            self.orders.clone(),
            self.payments.clone(),
            self.gateways.clone(),
            self.transitions.clone(),
        )
    }

    pub fn refund_payment_handler(&self) -> RefundPaymentHandler {
        RefundPaymentHandler::new(
            self.payments.clone(),
            self.gateways.clone(),
            self.transitions.clone(),
        )
    }

    pub fn sync_payment_handler(&self) -> SyncPaymentStatusHandler {
        SyncPaymentStatusHandler::new(
            self.payments.clone(),
            self.gateways.clone(),
            self.transitions.clone(),
        )
    }

    pub fn webhook_handler(&self) -> HandleWebhookHandler {
        HandleWebhookHandler::new(
            self.payments.clone(),
            self.gateways.clone(),
            self.verifiers.clone(),
            self.transitions.clone(),
        )
    }

    pub fn get_payment_handler(&self) -> GetPaymentHandler {
        GetPaymentHandler::new(self.payments.clone())
    }

    pub fn list_payments_handler(&self) -> ListPaymentsHandler {
        ListPaymentsHandler::new(self.payments.clone())
    }

    pub fn list_order_payments_handler(&self) -> ListOrderPaymentsHandler {
        ListOrderPaymentsHandler::new(self.orders.clone(), self.payments.clone())
    }
}

fn to_responses(payments: Vec<Payment>) -> Vec<PaymentResponse> {
    payments.into_iter().map(PaymentResponse::from).collect()
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /payments - Payments made by the caller, newest first
pub async fn list_my_payments(
    State(state): State<PaymentsAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, PaymentApiError> {
    let payments = state
        .list_payments_handler()
        .handle(ListPaymentsQuery::Mine(user.id))
        .await?;
    Ok(Json(to_responses(payments)))
}

/// GET /payments/admin/all - Every payment (admin only)
pub async fn list_all_payments(
    State(state): State<PaymentsAppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<impl IntoResponse, PaymentApiError> {
    let payments = state
        .list_payments_handler()
        .handle(ListPaymentsQuery::All)
        .await?;
    Ok(Json(to_responses(payments)))
}

/// GET /payments/:id - One payment, visible to its owner and admins
pub async fn get_payment(
    State(state): State<PaymentsAppState>,
    RequireAuth(user): RequireAuth,
    Path(payment_id): Path<PaymentId>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let payment = state
        .get_payment_handler()
        .handle(GetPaymentQuery {
            payment_id,
            requester: user,
        })
        .await?;
    Ok(Json(PaymentResponse::from(payment)))
}

/// GET /payments/order/:order_id - Attempts made against one order
pub async fn list_order_payments(
    State(state): State<PaymentsAppState>,
    RequireAuth(user): RequireAuth,
    Path(order_id): Path<OrderId>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let payments = state
        .list_order_payments_handler()
        .handle(ListOrderPaymentsQuery {
            order_id,
            requester: user,
        })
        .await?;
    Ok(Json(to_responses(payments)))
}

/// GET /health - Liveness probe
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /payments - Charge an order through the selected gateway
pub async fn create_payment(
    State(state): State<PaymentsAppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let cmd = CreatePaymentCommand {
        order_id: request.order_id,
        user_id: user.id,
        provider: request.provider,
        token: request.token,
        method: request.method,
        email: request.email,
        description: request.description,
        installments: request.installments,
        payment_method_id: request.payment_method_id,
        identification: request.identification,
        return_url: request.return_url,
    };

    let payment = state.create_payment_handler().handle(cmd).await?;

    Ok((StatusCode::CREATED, Json(PaymentResponse::from(payment))))
}

/// POST /payments/:id/refund - Refund a completed payment (admin only)
///
/// The body is optional; without it the whole amount is refunded.
pub async fn refund_payment(
    State(state): State<PaymentsAppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(payment_id): Path<PaymentId>,
    body: Option<Json<RefundPaymentRequest>>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    tracing::info!(payment_id = %payment_id, admin_id = %admin.id, "Refund requested");

    let cmd = RefundPaymentCommand {
        payment_id,
        amount: request.amount,
        reason: request.reason,
    };
    let payment = state.refund_payment_handler().handle(cmd).await?;

    Ok(Json(PaymentResponse::from(payment)))
}

/// POST /payments/:id/sync - Settle a stuck payment from the gateway (admin only)
pub async fn sync_payment(
    State(state): State<PaymentsAppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(payment_id): Path<PaymentId>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let payment = state
        .sync_payment_handler()
        .handle(SyncPaymentStatusCommand { payment_id })
        .await?;
    Ok(Json(PaymentResponse::from(payment)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook Handlers (no user auth, signature verified)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /payments/webhooks/culqi
pub async fn culqi_webhook(
    State(state): State<PaymentsAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = header_value(&headers, "x-culqi-signature");
    receive_webhook(&state, PaymentProvider::Culqi, signature, None, body).await
}

/// POST /payments/webhooks/mercadopago
pub async fn mercadopago_webhook(
    State(state): State<PaymentsAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = header_value(&headers, "x-signature");
    let request_id = header_value(&headers, "x-request-id");
    receive_webhook(&state, PaymentProvider::MercadoPago, signature, request_id, body).await
}

/// POST /payments/webhooks/stripe
pub async fn stripe_webhook(
    State(state): State<PaymentsAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = header_value(&headers, "stripe-signature");
    receive_webhook(&state, PaymentProvider::Stripe, signature, None, body).await
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Gateways only ever see success, ignored or unauthorized envelopes.
async fn receive_webhook(
    state: &PaymentsAppState,
    provider: PaymentProvider,
    signature: Option<String>,
    request_id: Option<String>,
    body: Bytes,
) -> Response {
    let cmd = HandleWebhookCommand {
        provider,
        payload: body.to_vec(),
        signature,
        request_id,
        received_at: Timestamp::now(),
    };

    match state.webhook_handler().handle(cmd).await {
        Ok(outcome) => (StatusCode::OK, Json(WebhookResponse::from(outcome))).into_response(),
        Err(PaymentError::Authentication(message)) => (
            StatusCode::UNAUTHORIZED,
            Json(WebhookResponse::rejected(message)),
        )
            .into_response(),
        Err(err @ PaymentError::ValidationFailed { .. }) => (
            StatusCode::BAD_REQUEST,
            Json(WebhookResponse::rejected(err.message())),
        )
            .into_response(),
        Err(err) => PaymentApiError::from(err).into_response(),
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts domain errors to HTTP responses.
#[derive(Debug)]
pub struct PaymentApiError(PaymentError);

impl From<PaymentError> for PaymentApiError {
    fn from(err: PaymentError) -> Self {
        Self(err)
    }
}

impl From<crate::domain::foundation::DomainError> for PaymentApiError {
    fn from(err: crate::domain::foundation::DomainError) -> Self {
        Self(PaymentError::from(err))
    }
}

impl IntoResponse for PaymentApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self.0 {
            PaymentError::NotFound { resource: "Order", .. } => {
                (StatusCode::NOT_FOUND, "ORDER_NOT_FOUND")
            }
            PaymentError::NotFound { .. } => (StatusCode::NOT_FOUND, "PAYMENT_NOT_FOUND"),
            PaymentError::InvalidState(_) => (StatusCode::BAD_REQUEST, "INVALID_STATE"),
            PaymentError::Conflict(_) => (StatusCode::CONFLICT, "PAYMENT_ALREADY_COMPLETED"),
            PaymentError::Gateway { .. } => (StatusCode::PAYMENT_REQUIRED, "PAYMENT_FAILED"),
            PaymentError::Authentication(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            PaymentError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            PaymentError::ValidationFailed { .. } => (StatusCode::BAD_REQUEST, "VALIDATION_FAILED"),
            PaymentError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = match &self.0 {
            PaymentError::Internal(detail) => {
                tracing::error!(error = %detail, "Payment request failed");
                ErrorResponse::new(error_code, "An unexpected error occurred")
            }
            PaymentError::ValidationFailed { field, .. } => ErrorResponse::with_details(
                error_code,
                self.0.message(),
                serde_json::json!({ "field": field }),
            ),
            other => ErrorResponse::new(error_code, other.message()),
        };

        (status, Json(body)).into_response()
    }
}

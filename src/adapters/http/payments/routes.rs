//! Axum router configuration for payment endpoints.
//!
//! This module defines the route structure for payment-related API endpoints
//! and wires them to their corresponding handlers.

use std::time::Duration;

use axum::{
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::adapters::http::middleware::{auth_middleware, AuthState};

use super::handlers::{
    create_payment, culqi_webhook, get_payment, health, list_all_payments, list_my_payments,
    list_order_payments, mercadopago_webhook, refund_payment, stripe_webhook, sync_payment,
    PaymentsAppState,
};

/// Create the payment API router.
///
/// # Routes
///
/// ## User Endpoints (require authentication)
/// - `POST /` - Charge an order
/// - `GET /` - Caller's payments
/// - `GET /:id` - One payment
/// - `GET /order/:order_id` - Attempts for an order
///
/// ## Admin Endpoints (require admin role)
/// - `GET /admin/all` - Every payment
/// - `POST /:id/refund` - Refund a completed payment
/// - `POST /:id/sync` - Re-read a stuck payment's status from its gateway
pub fn payment_routes() -> Router<PaymentsAppState> {
    Router::new()
        // User endpoints
        .route("/", post(create_payment).get(list_my_payments))
        .route("/order/:order_id", get(list_order_payments))
        .route("/:id", get(get_payment))
        // Admin endpoints
        .route("/admin/all", get(list_all_payments))
        .route("/:id/refund", post(refund_payment))
        .route("/:id/sync", post(sync_payment))
}

/// Create the gateway webhook router.
///
/// Separate from the payment routes because gateways authenticate by
/// signature, not by bearer token.
///
/// # Routes
/// - `POST /culqi`
/// - `POST /mercadopago`
/// - `POST /stripe`
pub fn webhook_routes() -> Router<PaymentsAppState> {
    Router::new()
        .route("/culqi", post(culqi_webhook))
        .route("/mercadopago", post(mercadopago_webhook))
        .route("/stripe", post(stripe_webhook))
}

/// Cross-cutting HTTP settings applied to every route.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub request_timeout: Duration,
    /// Allowed browser origins; empty allows any origin.
    pub cors_origins: Vec<String>,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            cors_origins: Vec::new(),
        }
    }
}

/// Create the complete payments service router.
///
/// Bearer authentication wraps the payment routes only; webhooks and the
/// health probe are reachable without a token.
///
/// # Example
///
/// ```ignore
/// let app = payments_router(app_state, validator, HttpOptions::default());
/// axum::serve(listener, app).await?;
/// ```
pub fn payments_router(state: PaymentsAppState, auth: AuthState, options: HttpOptions) -> Router {
    let authed = payment_routes().route_layer(middleware::from_fn_with_state(auth, auth_middleware));

    Router::new()
        .nest("/payments/webhooks", webhook_routes())
        .nest("/payments", authed)
        .route("/health", get(health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&options.cors_origins))
                .layer(TimeoutLayer::new(options.request_timeout)),
        )
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

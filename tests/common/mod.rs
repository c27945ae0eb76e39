//! Shared test infrastructure for payment integration tests.
//!
//! Wires the real application services and HTTP router to in-memory stores,
//! a mock Culqi gateway, a recording notifier and a mock session validator.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::{json, Value};
use sha2::Sha256;

use storefront_payments::adapters::auth::MockSessionValidator;
use storefront_payments::adapters::gateways::MockPaymentGateway;
use storefront_payments::adapters::http::{payments_router, HttpOptions, PaymentsAppState};
use storefront_payments::adapters::memory::{InMemoryOrderRepository, InMemoryPaymentRepository};
use storefront_payments::adapters::notification::RecordingNotifier;
use storefront_payments::application::{
    NotificationDispatcher, PaymentTransitions, WebhookVerifiers,
};
use storefront_payments::domain::foundation::{Money, Timestamp, UserId};
use storefront_payments::domain::order::Order;
use storefront_payments::domain::payment::{
    Payment, PaymentMethod, PaymentProvider, PaymentStatus, ReferenceNumber,
};
use storefront_payments::ports::GatewayRegistry;

pub const CULQI_SECRET: &str = "culqi_webhook_secret_for_tests";
pub const CUSTOMER_TOKEN: &str = "customer-token";
pub const OTHER_CUSTOMER_TOKEN: &str = "other-customer-token";
pub const ADMIN_TOKEN: &str = "admin-token";
pub const CUSTOMER_ID: &str = "customer-1";

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub payments: Arc<InMemoryPaymentRepository>,
    pub orders: Arc<InMemoryOrderRepository>,
    pub gateway: MockPaymentGateway,
    pub notifier: Arc<RecordingNotifier>,
    pub state: PaymentsAppState,
}

impl Harness {
    /// Culqi registered with a webhook secret.
    pub fn new() -> Self {
        Self::build(true)
    }

    /// Culqi registered without a webhook secret.
    pub fn unsigned() -> Self {
        Self::build(false)
    }

    fn build(signed: bool) -> Self {
        let payments = Arc::new(InMemoryPaymentRepository::new());
        let orders = Arc::new(InMemoryOrderRepository::new());
        let gateway = MockPaymentGateway::new(PaymentProvider::Culqi);
        let notifier = Arc::new(RecordingNotifier::new());

        let transitions = PaymentTransitions::new(
            payments.clone(),
            orders.clone(),
            NotificationDispatcher::new(notifier.clone()),
        );
        let verifiers = if signed {
            WebhookVerifiers::new().with_secret(
                PaymentProvider::Culqi,
                SecretString::new(CULQI_SECRET.to_string()),
            )
        } else {
            WebhookVerifiers::new()
        };

        let state = PaymentsAppState {
            orders: orders.clone(),
            payments: payments.clone(),
            gateways: GatewayRegistry::new().register(Arc::new(gateway.clone())),
            transitions,
            verifiers: Arc::new(verifiers),
        };

        Self {
            payments,
            orders,
            gateway,
            notifier,
            state,
        }
    }

    pub fn router(&self) -> Router {
        let validator = MockSessionValidator::new()
            .with_test_user(CUSTOMER_TOKEN, CUSTOMER_ID)
            .with_test_user(OTHER_CUSTOMER_TOKEN, "customer-2")
            .with_test_admin(ADMIN_TOKEN, "admin-1");

        payments_router(self.state.clone(), Arc::new(validator), HttpOptions::default())
    }

    pub fn transitions(&self) -> PaymentTransitions {
        self.state.transitions.clone()
    }

    /// A pending order owned by the default customer.
    pub fn order(&self, total: Decimal) -> Order {
        let order = Order::new(customer(), "ORD-1001", total, "PEN");
        self.orders.insert(order.clone());
        order
    }

    /// A stored Culqi payment for `order`.
    pub fn payment(&self, order: &Order, status: PaymentStatus, external_id: Option<&str>) -> Payment {
        let now = Timestamp::now();
        let mut payment = Payment::start(
            ReferenceNumber::generate(&now, self.payments.all().len() as u64 + 1),
            order.user_id.clone(),
            order.id,
            PaymentProvider::Culqi,
            PaymentMethod::Card,
            Money::new(order.total, &order.currency).unwrap(),
            Some("buyer@example.com".to_string()),
            now,
        );
        payment.status = status;
        payment.external_id = external_id.map(str::to_string);
        if status == PaymentStatus::Completed {
            payment.paid_at = Some(now);
        }
        self.payments.insert(payment.clone());
        payment
    }

    pub fn stored(&self, payment: &Payment) -> Payment {
        self.payments.get(&payment.id).unwrap()
    }

    /// Polls until at least `count` notifications were delivered.
    pub async fn wait_for_notifications(&self, count: usize) {
        for _ in 0..100 {
            if self.notifier.count() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "expected {} notifications, got {}",
            count,
            self.notifier.count()
        );
    }
}

pub fn customer() -> UserId {
    UserId::new(CUSTOMER_ID).unwrap()
}

/// Lets spawned notification tasks run.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

// =============================================================================
// Culqi Webhook Payloads
// =============================================================================

pub fn culqi_event(kind: &str, charge_id: &str) -> Value {
    json!({
        "id": format!("evt_{}", charge_id),
        "type": kind,
        "data": { "object": { "id": charge_id } }
    })
}

pub fn culqi_failed_event(charge_id: &str, user_message: &str) -> Value {
    json!({
        "id": format!("evt_failed_{}", charge_id),
        "type": "charge.creation.failed",
        "data": {
            "object": {
                "id": charge_id,
                "outcome": { "code": "card_declined", "user_message": user_message }
            }
        }
    })
}

/// Hex HMAC-SHA256 of the raw body, as Culqi sends it.
pub fn culqi_signature(body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(CULQI_SECRET.as_bytes()).unwrap();
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

//! Mock payment gateway for testing.
//!
//! Configurable stand-in for any of the three providers. Supports:
//! - Queued charge and refund outcomes
//! - Error injection per method
//! - Call tracking, including the canonical requests received
//! - Live statuses for `get_status` and IPN-style webhook lookups
//!
//! Webhook payloads are normalized with the real provider normalizers, so
//! the HTTP and reconciliation paths see provider-shaped events.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::domain::payment::{NormalizedWebhook, PaymentProvider};
use crate::ports::{
    ChargeRequest, ChargeResult, GatewayError, PaymentGateway, ProviderStatus, RefundRequest,
    RefundResult,
};

use super::{culqi, mercadopago, stripe};

/// Raw status the mock reports for approved charges.
pub const MOCK_APPROVED: &str = "approved";

/// Raw status the mock reports for deferred charges.
pub const MOCK_PENDING: &str = "pending";

/// Raw status the mock reports when the customer must act.
pub const MOCK_REQUIRES_ACTION: &str = "requires_action";

/// Mock payment gateway.
///
/// # Example
///
/// ```ignore
/// let gateway = MockPaymentGateway::new(PaymentProvider::Culqi);
/// gateway.decline_next_charge("Insufficient funds");
///
/// let result = gateway.charge(request).await;
/// assert_eq!(gateway.call_count("charge"), 1);
/// ```
#[derive(Clone)]
pub struct MockPaymentGateway {
    provider: PaymentProvider,
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    /// Outcomes returned by the next `charge` calls, oldest first.
    charge_results: VecDeque<Result<ChargeResult, GatewayError>>,

    /// Outcomes returned by the next `refund` calls, oldest first.
    refund_results: VecDeque<Result<RefundResult, GatewayError>>,

    /// Live statuses by external id.
    statuses: HashMap<String, ProviderStatus>,

    /// Errors returned by every call of a method until cleared.
    method_errors: HashMap<String, GatewayError>,

    /// Delay applied before a charge answers.
    charge_delay: Option<Duration>,

    /// Delay applied before a refund answers.
    refund_delay: Option<Duration>,

    charges: Vec<ChargeRequest>,
    refunds: Vec<RefundRequest>,
    call_log: Vec<GatewayCall>,
    sequence: u32,
}

/// Recorded gateway call for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayCall {
    pub method: String,
    pub argument: String,
}

impl MockPaymentGateway {
    /// Create a mock that approves every charge and refund.
    pub fn new(provider: PaymentProvider) -> Self {
        Self {
            provider,
            inner: Arc::new(Mutex::new(MockState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Queue the outcome of the next `charge` call.
    pub fn queue_charge(&self, result: Result<ChargeResult, GatewayError>) {
        self.state().charge_results.push_back(result);
    }

    /// Queue an accepted charge with the given external id and raw status.
    pub fn queue_charge_status(&self, external_id: &str, status: &str) {
        self.queue_charge(Ok(ChargeResult {
            external_id: external_id.to_string(),
            status: status.to_string(),
            card_mask: Some("****4242".to_string()),
            card_brand: Some("visa".to_string()),
            raw: json!({ "id": external_id, "status": status }),
        }));
    }

    /// Make the next charge a decline with the gateway's message.
    pub fn decline_next_charge(&self, message: &str) {
        self.queue_charge(Err(GatewayError::declined(self.provider, message)));
    }

    /// Queue the outcome of the next `refund` call.
    pub fn queue_refund(&self, result: Result<RefundResult, GatewayError>) {
        self.state().refund_results.push_back(result);
    }

    /// Set the live status `get_status` reports for a transaction.
    pub fn set_status(&self, external_id: &str, status: &str, detail: Option<&str>) {
        self.state().statuses.insert(
            external_id.to_string(),
            ProviderStatus {
                external_id: external_id.to_string(),
                status: status.to_string(),
                detail: detail.map(str::to_string),
                card_mask: None,
                card_brand: None,
                raw: json!({ "id": external_id, "status": status }),
            },
        );
    }

    /// Fail every call of `method` until cleared.
    pub fn set_method_error(&self, method: &str, error: GatewayError) {
        self.state().method_errors.insert(method.to_string(), error);
    }

    /// Clear all configured errors.
    pub fn clear_errors(&self) {
        self.state().method_errors.clear();
    }

    /// Delay every charge answer, widening race windows in tests.
    pub fn set_charge_delay(&self, delay: Duration) {
        self.state().charge_delay = Some(delay);
    }

    /// Delay every refund answer.
    pub fn set_refund_delay(&self, delay: Duration) {
        self.state().refund_delay = Some(delay);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    /// Get all recorded calls.
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.state().call_log.clone()
    }

    /// Number of calls made to `method`.
    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    /// Check if a method was called.
    pub fn was_called(&self, method: &str) -> bool {
        self.call_count(method) > 0
    }

    /// Charge requests received, oldest first.
    pub fn charge_requests(&self) -> Vec<ChargeRequest> {
        self.state().charges.clone()
    }

    /// Refund requests received, oldest first.
    pub fn refund_requests(&self) -> Vec<RefundRequest> {
        self.state().refunds.clone()
    }

    fn record(&self, method: &str, argument: impl Into<String>) -> Option<GatewayError> {
        let mut state = self.state();
        state.call_log.push(GatewayCall {
            method: method.to_string(),
            argument: argument.into(),
        });
        state.method_errors.get(method).cloned()
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut state = self.state();
        state.sequence += 1;
        format!("{}_{}_{}", prefix, self.provider, state.sequence)
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    fn provider(&self) -> PaymentProvider {
        self.provider
    }

    async fn charge(&self, request: ChargeRequest) -> Result<ChargeResult, GatewayError> {
        if let Some(err) = self.record("charge", request.reference.clone()) {
            return Err(err);
        }

        let (queued, delay) = {
            let mut state = self.state();
            state.charges.push(request.clone());
            (state.charge_results.pop_front(), state.charge_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match queued {
            Some(result) => result,
            None => {
                let external_id = self.next_id("ch");
                Ok(ChargeResult {
                    raw: json!({
                        "id": external_id,
                        "status": MOCK_APPROVED,
                        "reference": request.reference,
                    }),
                    external_id,
                    status: MOCK_APPROVED.to_string(),
                    card_mask: Some("****4242".to_string()),
                    card_brand: Some("visa".to_string()),
                })
            }
        }
    }

    async fn refund(&self, request: RefundRequest) -> Result<RefundResult, GatewayError> {
        if let Some(err) = self.record("refund", request.external_id.clone()) {
            return Err(err);
        }

        let (queued, delay) = {
            let mut state = self.state();
            state.refunds.push(request.clone());
            (state.refund_results.pop_front(), state.refund_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match queued {
            Some(result) => result,
            None => {
                let refund_id = self.next_id("re");
                Ok(RefundResult {
                    raw: json!({ "id": refund_id, "status": "succeeded" }),
                    refund_id,
                    status: "succeeded".to_string(),
                })
            }
        }
    }

    async fn get_status(&self, external_id: &str) -> Result<ProviderStatus, GatewayError> {
        if let Some(err) = self.record("get_status", external_id) {
            return Err(err);
        }

        self.state()
            .statuses
            .get(external_id)
            .cloned()
            .ok_or_else(|| GatewayError::not_found(self.provider, external_id))
    }

    async fn normalize_webhook(&self, payload: &Value) -> Result<NormalizedWebhook, GatewayError> {
        if let Some(err) = self.record("normalize_webhook", payload.to_string()) {
            return Err(err);
        }

        match self.provider {
            PaymentProvider::Culqi => culqi::normalize(payload),
            PaymentProvider::MercadoPago => mercadopago::normalize(self, payload).await,
            PaymentProvider::Stripe => stripe::normalize(payload),
        }
    }

    fn is_approved(&self, status: &str) -> bool {
        status == MOCK_APPROVED
    }

    fn is_pending(&self, status: &str) -> bool {
        status == MOCK_PENDING
    }

    fn requires_additional_action(&self, status: &str) -> bool {
        status == MOCK_REQUIRES_ACTION
    }
}

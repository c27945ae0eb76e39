//! Webhook signature verification.
//!
//! All three gateways sign deliveries with HMAC-SHA256 but disagree on what
//! is signed and how the digest travels:
//!
//! | Scheme | Provider | Signed content | Header |
//! |--------|----------|----------------|--------|
//! | Body | Culqi | raw body | hex digest |
//! | Manifest | MercadoPago | `id:<dataId>;request-id:<reqId>;ts:<ts>;` | `ts=..,v1=..` |
//! | Timestamped | Stripe | `<t>.<raw body>` | `t=..,v1=..` |
//!
//! Digests are always compared in constant time.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::webhook_errors::WebhookError;
use super::PaymentProvider;

/// Replay window for timestamped signatures, in either direction.
pub const REPLAY_WINDOW_SECS: i64 = 300;

/// How a provider signs its deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureScheme {
    Body,
    Manifest,
    Timestamped,
}

impl SignatureScheme {
    pub fn for_provider(provider: PaymentProvider) -> Self {
        match provider {
            PaymentProvider::Culqi => SignatureScheme::Body,
            PaymentProvider::MercadoPago => SignatureScheme::Manifest,
            PaymentProvider::Stripe => SignatureScheme::Timestamped,
        }
    }
}

/// Parsed `key=value` signature header (`t=..,v1=..` or `ts=..,v1=..`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Raw timestamp exactly as sent; the manifest scheme signs it verbatim.
    pub timestamp: String,
    /// All `v1` digests; gateways send several while rotating secrets.
    pub v1_signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    /// Parses a comma-separated header, reading the timestamp from `ts_key`.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::ParseError` if the timestamp or every `v1`
    /// digest is missing or malformed.
    pub fn parse(header: &str, ts_key: &str) -> Result<Self, WebhookError> {
        let mut timestamp: Option<String> = None;
        let mut v1_signatures = Vec::new();

        for part in header.split(',') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or_else(|| WebhookError::ParseError("invalid header format".to_string()))?;

            match key.trim() {
                k if k == ts_key => timestamp = Some(value.trim().to_string()),
                "v1" => {
                    let digest = hex::decode(value.trim()).map_err(|_| {
                        WebhookError::ParseError("invalid v1 signature hex".to_string())
                    })?;
                    v1_signatures.push(digest);
                }
                _ => {
                    // Unknown fields are ignored for forward compatibility
                }
            }
        }

        let timestamp = timestamp
            .filter(|ts| !ts.is_empty())
            .ok_or_else(|| WebhookError::ParseError("missing timestamp".to_string()))?;
        if v1_signatures.is_empty() {
            return Err(WebhookError::ParseError("missing v1 signature".to_string()));
        }

        Ok(Self {
            timestamp,
            v1_signatures,
        })
    }

    fn unix_timestamp(&self) -> Result<i64, WebhookError> {
        self.timestamp
            .parse()
            .map_err(|_| WebhookError::ParseError("invalid timestamp".to_string()))
    }

    fn matches(&self, expected: &[u8]) -> bool {
        self.v1_signatures
            .iter()
            .any(|candidate| constant_time_compare(expected, candidate))
    }
}

/// Verifies deliveries for one provider with its shared secret.
pub struct WebhookVerifier {
    secret: SecretString,
}

impl WebhookVerifier {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Culqi: the header is the hex HMAC of the raw body.
    pub fn verify_body(&self, payload: &[u8], signature: &str) -> Result<(), WebhookError> {
        let provided = hex::decode(signature.trim()).map_err(|_| WebhookError::InvalidSignature)?;
        let expected = self.compute(payload)?;

        if !constant_time_compare(&expected, &provided) {
            return Err(WebhookError::InvalidSignature);
        }
        Ok(())
    }

    /// MercadoPago: the header signs a manifest built from the notification
    /// data id, the `x-request-id` header and the header timestamp.
    pub fn verify_manifest(
        &self,
        data_id: &str,
        request_id: &str,
        signature_header: &str,
    ) -> Result<(), WebhookError> {
        let header = SignatureHeader::parse(signature_header, "ts")?;
        let manifest = format!(
            "id:{};request-id:{};ts:{};",
            data_id, request_id, header.timestamp
        );
        let expected = self.compute(manifest.as_bytes())?;

        if !header.matches(&expected) {
            return Err(WebhookError::InvalidSignature);
        }
        Ok(())
    }

    /// Stripe: the header signs `<t>.<body>` and `t` must be within the
    /// replay window of `now` even when the digest matches.
    pub fn verify_timestamped(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: i64,
    ) -> Result<(), WebhookError> {
        let header = SignatureHeader::parse(signature_header, "t")?;
        let timestamp = header.unix_timestamp()?;

        // `t` is sender-controlled; abs_diff cannot overflow
        if now.abs_diff(timestamp) > REPLAY_WINDOW_SECS.unsigned_abs() {
            return Err(WebhookError::TimestampOutOfRange);
        }

        let mut signed = Vec::with_capacity(header.timestamp.len() + 1 + payload.len());
        signed.extend_from_slice(header.timestamp.as_bytes());
        signed.push(b'.');
        signed.extend_from_slice(payload);
        let expected = self.compute(&signed)?;

        if !header.matches(&expected) {
            return Err(WebhookError::InvalidSignature);
        }
        Ok(())
    }

    fn compute(&self, message: &[u8]) -> Result<Vec<u8>, WebhookError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| WebhookError::InvalidSignature)?;
        mac.update(message);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

/// Performs constant-time comparison of two byte slices.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Hex HMAC-SHA256 of `message`, for building signed fixtures in tests.
#[cfg(test)]
pub fn sign_for_tests(secret: &str, message: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key");
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret_12345";
    const NOW: i64 = 1_704_067_200;

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new(SecretString::new(SECRET.to_string()))
    }

    fn stripe_header(timestamp: i64, payload: &str) -> String {
        let signed = format!("{}.{}", timestamp, payload);
        format!("t={},v1={}", timestamp, sign_for_tests(SECRET, signed.as_bytes()))
    }

    // ══════════════════════════════════════════════════════════════
    // Header Parsing
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn parse_header_reads_timestamp_and_signature() {
        let header = SignatureHeader::parse(&format!("t=1234567890,v1={}", "a".repeat(64)), "t")
            .unwrap();

        assert_eq!(header.timestamp, "1234567890");
        assert_eq!(header.v1_signatures.len(), 1);
        assert_eq!(header.v1_signatures[0].len(), 32);
    }

    #[test]
    fn parse_header_keeps_every_v1_signature() {
        let raw = format!("t=1,v1={},v1={},v0={}", "a".repeat(64), "b".repeat(64), "c".repeat(64));
        let header = SignatureHeader::parse(&raw, "t").unwrap();
        assert_eq!(header.v1_signatures.len(), 2);
    }

    #[test]
    fn parse_header_uses_requested_timestamp_key() {
        let raw = format!("ts=1704067200, v1={}", "a".repeat(64));
        assert!(SignatureHeader::parse(&raw, "ts").is_ok());
        assert!(matches!(
            SignatureHeader::parse(&raw, "t"),
            Err(WebhookError::ParseError(_))
        ));
    }

    #[test]
    fn parse_header_rejects_missing_parts() {
        assert!(SignatureHeader::parse("t=1", "t").is_err());
        assert!(SignatureHeader::parse(&format!("v1={}", "a".repeat(64)), "t").is_err());
        assert!(SignatureHeader::parse("t1234", "t").is_err());
        assert!(SignatureHeader::parse("t=1,v1=not_hex", "t").is_err());
    }

    // ══════════════════════════════════════════════════════════════
    // Body Scheme (Culqi)
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn body_signature_accepts_valid_digest() {
        let payload = br#"{"type":"charge.creation.succeeded"}"#;
        let signature = sign_for_tests(SECRET, payload);

        assert!(verifier().verify_body(payload, &signature).is_ok());
    }

    #[test]
    fn body_signature_accepts_uppercase_hex() {
        let payload = br#"{"id":"chr_1"}"#;
        let signature = sign_for_tests(SECRET, payload).to_uppercase();

        assert!(verifier().verify_body(payload, &signature).is_ok());
    }

    #[test]
    fn body_signature_rejects_tampered_body() {
        let signature = sign_for_tests(SECRET, br#"{"amount":100}"#);

        let result = verifier().verify_body(br#"{"amount":999}"#, &signature);

        assert_eq!(result, Err(WebhookError::InvalidSignature));
    }

    #[test]
    fn body_signature_rejects_garbage_header() {
        assert_eq!(
            verifier().verify_body(b"{}", "not-a-digest"),
            Err(WebhookError::InvalidSignature)
        );
    }

    // ══════════════════════════════════════════════════════════════
    // Manifest Scheme (MercadoPago)
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn manifest_signature_accepts_valid_digest() {
        let manifest = "id:123456;request-id:req-1;ts:1704067200;";
        let header = format!("ts=1704067200,v1={}", sign_for_tests(SECRET, manifest.as_bytes()));

        assert!(verifier().verify_manifest("123456", "req-1", &header).is_ok());
    }

    #[test]
    fn manifest_signature_rejects_other_data_id() {
        let manifest = "id:123456;request-id:req-1;ts:1704067200;";
        let header = format!("ts=1704067200,v1={}", sign_for_tests(SECRET, manifest.as_bytes()));

        let result = verifier().verify_manifest("999999", "req-1", &header);

        assert_eq!(result, Err(WebhookError::InvalidSignature));
    }

    // ══════════════════════════════════════════════════════════════
    // Timestamped Scheme (Stripe)
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn timestamped_signature_accepts_valid_digest() {
        let payload = r#"{"id":"evt_1"}"#;
        let header = stripe_header(NOW, payload);

        assert!(verifier().verify_timestamped(payload.as_bytes(), &header, NOW).is_ok());
    }

    #[test]
    fn timestamped_signature_rejects_tampered_body() {
        let header = stripe_header(NOW, r#"{"id":"evt_1"}"#);

        let result = verifier().verify_timestamped(br#"{"id":"evt_2"}"#, &header, NOW);

        assert_eq!(result, Err(WebhookError::InvalidSignature));
    }

    #[test]
    fn timestamped_signature_accepts_boundary_of_window() {
        let payload = "{}";
        let old = stripe_header(NOW - REPLAY_WINDOW_SECS, payload);
        let future = stripe_header(NOW + REPLAY_WINDOW_SECS, payload);

        assert!(verifier().verify_timestamped(payload.as_bytes(), &old, NOW).is_ok());
        assert!(verifier().verify_timestamped(payload.as_bytes(), &future, NOW).is_ok());
    }

    #[test]
    fn timestamped_signature_rejects_replay_even_with_valid_digest() {
        let payload = "{}";
        let stale = stripe_header(NOW - REPLAY_WINDOW_SECS - 1, payload);
        let ahead = stripe_header(NOW + REPLAY_WINDOW_SECS + 1, payload);

        assert_eq!(
            verifier().verify_timestamped(payload.as_bytes(), &stale, NOW),
            Err(WebhookError::TimestampOutOfRange)
        );
        assert_eq!(
            verifier().verify_timestamped(payload.as_bytes(), &ahead, NOW),
            Err(WebhookError::TimestampOutOfRange)
        );
    }

    #[test]
    fn timestamped_signature_rejects_extreme_timestamps() {
        let payload = "{}";

        for t in [i64::MIN, i64::MAX] {
            let header = format!("t={},v1=00", t);
            assert_eq!(
                verifier().verify_timestamped(payload.as_bytes(), &header, NOW),
                Err(WebhookError::TimestampOutOfRange)
            );
        }
        assert_eq!(
            verifier().verify_timestamped(payload.as_bytes(), "t=0,v1=00", i64::MAX),
            Err(WebhookError::TimestampOutOfRange)
        );
    }

    #[test]
    fn timestamped_signature_accepts_any_rotated_secret() {
        let payload = "{}";
        let valid = sign_for_tests(SECRET, format!("{}.{}", NOW, payload).as_bytes());
        let header = format!("t={},v1={},v1={}", NOW, "0".repeat(64), valid);

        assert!(verifier().verify_timestamped(payload.as_bytes(), &header, NOW).is_ok());
    }

    #[test]
    fn wrong_secret_fails() {
        let payload = "{}";
        let header = stripe_header(NOW, payload);
        let other = WebhookVerifier::new(SecretString::new("other".to_string()));

        assert_eq!(
            other.verify_timestamped(payload.as_bytes(), &header, NOW),
            Err(WebhookError::InvalidSignature)
        );
    }

    // ══════════════════════════════════════════════════════════════
    // Constant Time Comparison
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn constant_time_compare_checks_length_and_content() {
        assert!(constant_time_compare(&[1, 2, 3], &[1, 2, 3]));
        assert!(!constant_time_compare(&[1, 2, 3], &[1, 2, 4]));
        assert!(!constant_time_compare(&[1, 2], &[1, 2, 3]));
    }

    #[test]
    fn schemes_are_assigned_per_provider() {
        assert_eq!(SignatureScheme::for_provider(PaymentProvider::Culqi), SignatureScheme::Body);
        assert_eq!(
            SignatureScheme::for_provider(PaymentProvider::MercadoPago),
            SignatureScheme::Manifest
        );
        assert_eq!(
            SignatureScheme::for_provider(PaymentProvider::Stripe),
            SignatureScheme::Timestamped
        );
    }
}

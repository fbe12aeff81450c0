//! Stripe webhook signature verification.
//!
//! Implements Stripe's v1 scheme:
//! <https://docs.stripe.com/webhooks#verify-manually>
//!
//! The header looks like `t=1492774577,v1=5257a8...,v1=...`. The signed
//! payload is `"{t}.{raw_body}"` and each `v1` is the lowercase hex
//! HMAC-SHA256 of it keyed with the endpoint secret. Several `v1` entries
//! appear while a secret is being rolled; any one matching is enough.

use std::time::Duration;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use tracing::{debug, instrument};

use super::error::SignatureError;
use super::types::Event;

/// Header carrying the signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

const EXPECTED_SCHEME: &str = "v1";

type HmacSha256 = Hmac<Sha256>;

/// Verifies deliveries for one webhook endpoint secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: SecretString,
    tolerance: Duration,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("secret", &"[REDACTED]")
            .field("tolerance", &self.tolerance)
            .finish()
    }
}

/// Parsed `Stripe-Signature` header.
#[derive(Debug, PartialEq, Eq)]
struct SignatureHeader<'a> {
    timestamp: i64,
    signatures: Vec<&'a str>,
}

impl<'a> SignatureHeader<'a> {
    fn parse(header: &'a str) -> Result<Self, SignatureError> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            let Some((key, value)) = part.trim().split_once('=') else {
                continue;
            };
            match key {
                "t" => timestamp = value.parse::<i64>().ok(),
                EXPECTED_SCHEME => signatures.push(value),
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
        if signatures.is_empty() {
            return Err(SignatureError::NoSignatures);
        }

        Ok(Self {
            timestamp,
            signatures,
        })
    }
}

impl WebhookVerifier {
    /// Create a verifier for an endpoint secret.
    #[must_use]
    pub const fn new(secret: SecretString, tolerance: Duration) -> Self {
        Self { secret, tolerance }
    }

    /// Verify a delivery against the current time and parse its event.
    ///
    /// `payload` must be the body exactly as received.
    ///
    /// # Errors
    ///
    /// Returns a [`SignatureError`] if the header is absent or malformed, the
    /// timestamp is out of tolerance, no signature matches, or the body is
    /// not an event.
    pub fn construct_event(
        &self,
        payload: &[u8],
        header: Option<&str>,
    ) -> Result<Event, SignatureError> {
        self.construct_event_at(payload, header, chrono::Utc::now().timestamp())
    }

    /// Same as [`Self::construct_event`] with an explicit clock.
    ///
    /// # Errors
    ///
    /// See [`Self::construct_event`].
    #[instrument(skip(self, payload, header))]
    pub fn construct_event_at(
        &self,
        payload: &[u8],
        header: Option<&str>,
        now: i64,
    ) -> Result<Event, SignatureError> {
        let header = header
            .filter(|h| !h.trim().is_empty())
            .ok_or(SignatureError::MissingHeader)?;

        self.verify_at(payload, header, now)?;

        let event: Event = serde_json::from_slice(payload)
            .map_err(|e| SignatureError::InvalidPayload(e.to_string()))?;

        debug!(event_id = ?event.id, kind = %event.kind, "Stripe signature verified");

        Ok(event)
    }

    fn verify_at(&self, payload: &[u8], header: &str, now: i64) -> Result<(), SignatureError> {
        let parsed = SignatureHeader::parse(header)?;
        let expected = self.compute_signature(parsed.timestamp, payload)?;

        if !parsed
            .signatures
            .iter()
            .any(|candidate| constant_time_compare(&expected, candidate))
        {
            return Err(SignatureError::Mismatch);
        }

        let tolerance = i64::try_from(self.tolerance.as_secs()).unwrap_or(i64::MAX);
        if tolerance > 0 && now.saturating_sub(parsed.timestamp).abs() > tolerance {
            return Err(SignatureError::TimestampOutsideTolerance);
        }

        Ok(())
    }

    /// Hex HMAC-SHA256 of `"{timestamp}.{payload}"`.
    ///
    /// # Errors
    ///
    /// Returns error if the secret cannot key the HMAC.
    pub fn compute_signature(
        &self,
        timestamp: i64,
        payload: &[u8],
    ) -> Result<String, SignatureError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| SignatureError::Mismatch)?;

        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);

        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Build a complete `Stripe-Signature` header value for `payload`.
    ///
    /// Used to sign test deliveries and local replays.
    ///
    /// # Errors
    ///
    /// Returns error if the secret cannot key the HMAC.
    pub fn sign(&self, timestamp: i64, payload: &[u8]) -> Result<String, SignatureError> {
        let signature = self.compute_signature(timestamp, payload)?;
        Ok(format!("t={timestamp},{EXPECTED_SCHEME}={signature}"))
    }
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;
    const BODY: &[u8] = br#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{}}}"#;

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new(
            SecretString::from("whsec_test_secret"),
            Duration::from_secs(300),
        )
    }

    #[test]
    fn test_valid_signature() {
        let v = verifier();
        let header = v.sign(NOW, BODY).unwrap();
        let event = v.construct_event_at(BODY, Some(&header), NOW).unwrap();
        assert!(event.is_checkout_completed());
    }

    #[test]
    fn test_signature_matches_reference_hmac() {
        // Independently computed HMAC over "t.body"
        let mut mac = HmacSha256::new_from_slice(b"whsec_test_secret").unwrap();
        mac.update(format!("{NOW}.").as_bytes());
        mac.update(BODY);
        let reference = hex::encode(mac.finalize().into_bytes());

        assert_eq!(verifier().compute_signature(NOW, BODY).unwrap(), reference);
    }

    #[test]
    fn test_missing_header() {
        let v = verifier();
        assert_eq!(
            v.construct_event_at(BODY, None, NOW).unwrap_err(),
            SignatureError::MissingHeader
        );
        assert_eq!(
            v.construct_event_at(BODY, Some(""), NOW).unwrap_err(),
            SignatureError::MissingHeader
        );
    }

    #[test]
    fn test_malformed_header() {
        let v = verifier();
        assert_eq!(
            v.construct_event_at(BODY, Some("garbage"), NOW).unwrap_err(),
            SignatureError::MalformedHeader
        );
        assert_eq!(
            v.construct_event_at(BODY, Some("t=abc,v1=00"), NOW)
                .unwrap_err(),
            SignatureError::MalformedHeader
        );
    }

    #[test]
    fn test_no_v1_signatures() {
        let header = format!("t={NOW},v0=deadbeef");
        assert_eq!(
            verifier()
                .construct_event_at(BODY, Some(&header), NOW)
                .unwrap_err(),
            SignatureError::NoSignatures
        );
    }

    #[test]
    fn test_wrong_secret() {
        let other = WebhookVerifier::new(SecretString::from("whsec_other"), Duration::from_secs(300));
        let header = other.sign(NOW, BODY).unwrap();
        assert_eq!(
            verifier()
                .construct_event_at(BODY, Some(&header), NOW)
                .unwrap_err(),
            SignatureError::Mismatch
        );
    }

    #[test]
    fn test_tampered_body() {
        let v = verifier();
        let header = v.sign(NOW, BODY).unwrap();
        let tampered = br#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{"x":1}}}"#;
        assert_eq!(
            v.construct_event_at(tampered, Some(&header), NOW).unwrap_err(),
            SignatureError::Mismatch
        );
    }

    #[test]
    fn test_reserialized_body_fails() {
        // Whitespace changes from re-serialization break the signature
        let v = verifier();
        let pretty = b"{\n  \"type\": \"checkout.session.completed\"\n}";
        let header = v.sign(NOW, pretty).unwrap();
        let compact = br#"{"type":"checkout.session.completed"}"#;
        assert_eq!(
            v.construct_event_at(compact, Some(&header), NOW).unwrap_err(),
            SignatureError::Mismatch
        );
        assert!(v.construct_event_at(pretty, Some(&header), NOW).is_ok());
    }

    #[test]
    fn test_timestamp_outside_tolerance() {
        let v = verifier();
        let old = NOW - 600;
        let header = v.sign(old, BODY).unwrap();
        assert_eq!(
            v.construct_event_at(BODY, Some(&header), NOW).unwrap_err(),
            SignatureError::TimestampOutsideTolerance
        );

        let future = NOW + 600;
        let header = v.sign(future, BODY).unwrap();
        assert_eq!(
            v.construct_event_at(BODY, Some(&header), NOW).unwrap_err(),
            SignatureError::TimestampOutsideTolerance
        );
    }

    #[test]
    fn test_any_v1_may_match() {
        let v = verifier();
        let good = v.compute_signature(NOW, BODY).unwrap();
        let header = format!("t={NOW},v1={},v1={good}", "0".repeat(64));
        assert!(v.construct_event_at(BODY, Some(&header), NOW).is_ok());
    }

    #[test]
    fn test_invalid_json_after_valid_signature() {
        let v = verifier();
        let body = b"not json";
        let header = v.sign(NOW, body).unwrap();
        assert!(matches!(
            v.construct_event_at(body, Some(&header), NOW),
            Err(SignatureError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("hello", "hello"));
        assert!(!constant_time_compare("hello", "world"));
        assert!(!constant_time_compare("hello", "hell"));
    }
}

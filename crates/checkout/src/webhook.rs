//! Webhook signature verification and event parsing.
//!
//! Deliveries carry a `Stripe-Signature` style header:
//! `t=<unix seconds>,v1=<hex hmac-sha256>` where the MAC covers
//! `"{t}.{payload}"` under the shared webhook secret. Verification fails
//! closed: any parse error, stale timestamp or MAC mismatch rejects the
//! delivery before it can cause side effects.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::error::CheckoutError;

type HmacSha256 = Hmac<Sha256>;

/// Event type emitted by the gateway when a payment settles.
pub const PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";

/// HTTP header carrying the delivery signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

const DEFAULT_TOLERANCE: Duration = Duration::from_secs(300);

/// Verifies webhook delivery signatures against the shared secret.
#[derive(Debug, Clone)]
pub struct WebhookVerifier {
    secret: String,
    tolerance: Duration,
}

impl WebhookVerifier {
    /// Creates a verifier with the default 5-minute replay tolerance.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    /// Overrides the timestamp tolerance window.
    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Checks the signature header against the payload. Ok(()) means the
    /// delivery is authentic and recent enough to process.
    pub fn verify(&self, payload: &[u8], signature_header: &str) -> Result<(), CheckoutError> {
        let mut timestamp = None;
        let mut signature = None;
        for part in signature_header.split(',') {
            match part.split_once('=') {
                Some(("t", value)) => timestamp = Some(value),
                Some(("v1", value)) => signature = Some(value),
                _ => {}
            }
        }

        let timestamp = timestamp
            .ok_or(CheckoutError::SignatureInvalid("missing timestamp"))?
            .parse::<i64>()
            .map_err(|_| CheckoutError::SignatureInvalid("unparsable timestamp"))?;
        let signature = signature.ok_or(CheckoutError::SignatureInvalid("missing signature"))?;

        let age = (Utc::now().timestamp() - timestamp).unsigned_abs();
        if age > self.tolerance.as_secs() {
            return Err(CheckoutError::SignatureInvalid("timestamp outside tolerance"));
        }

        let expected = hex::decode(signature)
            .map_err(|_| CheckoutError::SignatureInvalid("signature is not hex"))?;

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| CheckoutError::SignatureInvalid("invalid secret"))?;
        mac.update(format!("{timestamp}.").as_bytes());
        mac.update(payload);
        mac.verify_slice(&expected)
            .map_err(|_| CheckoutError::SignatureInvalid("signature mismatch"))
    }

    /// Produces a valid signature header for a payload at the given
    /// timestamp. Used by tests to forge gateway deliveries.
    pub fn sign(&self, payload: &[u8], timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts keys of any size");
        mac.update(format!("{timestamp}.").as_bytes());
        mac.update(payload);
        format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
    }
}

/// A delivered gateway event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: GatewayEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayEventData {
    pub object: IntentObject,
}

/// The payment intent carried inside an event.
#[derive(Debug, Clone, Deserialize)]
pub struct IntentObject {
    pub id: String,
    /// Gateway-reported amount in minor units.
    pub amount: i64,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl GatewayEvent {
    /// Parses a delivery payload.
    pub fn parse(payload: &[u8]) -> Result<Self, CheckoutError> {
        serde_json::from_slice(payload).map_err(|e| CheckoutError::MalformedEvent(e.to_string()))
    }
}

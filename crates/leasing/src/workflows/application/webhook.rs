use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use super::domain::CheckoutSessionId;
use super::gateway::CheckoutSessionState;

type HmacSha256 = Hmac<Sha256>;

/// Provider deliveries older than this are rejected even with a valid MAC.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

pub const CHECKOUT_COMPLETED_EVENT: &str = "checkout.session.completed";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature header is malformed")]
    Malformed,
    #[error("signature timestamp outside tolerance")]
    Expired,
    #[error("signature does not match payload")]
    Mismatch,
}

/// Verify a `t=<unix>,v1=<hex>` signature header against the raw payload.
///
/// The MAC covers `"{timestamp}.{payload}"` with the shared webhook secret.
/// Verification happens before the payload is parsed or any storage is
/// touched; `now` is injected so expiry is testable.
pub fn verify_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    now_unix: i64,
) -> Result<(), SignatureError> {
    let (timestamp, provided) = parse_signature_header(signature_header)?;

    if (now_unix - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(SignatureError::Expired);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::Malformed)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());

    if constant_time_eq(expected.as_bytes(), provided.as_bytes()) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Compute the header value a provider (or the demo harness) would attach.
pub fn sign_payload(payload: &[u8], secret: &str, timestamp_unix: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("hmac accepts keys of any length");
    mac.update(timestamp_unix.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={timestamp_unix},v1={}", hex::encode(mac.finalize().into_bytes()))
}

fn parse_signature_header(header: &str) -> Result<(i64, &str), SignatureError> {
    let mut timestamp = None;
    let mut signature = None;
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = Some(value.parse::<i64>().map_err(|_| SignatureError::Malformed)?);
            }
            Some(("v1", value)) => signature = Some(value),
            _ => {}
        }
    }
    match (timestamp, signature) {
        (Some(t), Some(v1)) if !v1.is_empty() => Ok((t, v1)),
        _ => Err(SignatureError::Malformed),
    }
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter().zip(right).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
}

/// Parsed completion event carrying the session snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    pub object: WebhookSession,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookSession {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
}

#[derive(Debug, thiserror::Error)]
#[error("webhook payload is not valid JSON: {0}")]
pub struct EventParseError(#[from] serde_json::Error);

impl WebhookEvent {
    pub fn parse(payload: &[u8]) -> Result<Self, EventParseError> {
        Ok(serde_json::from_slice(payload)?)
    }

    pub fn is_checkout_completed(&self) -> bool {
        self.event_type == CHECKOUT_COMPLETED_EVENT
    }

    pub fn session_id(&self) -> CheckoutSessionId {
        CheckoutSessionId(self.data.object.id.clone())
    }

    /// View of the event as a session state so the paid-proof rule lives in
    /// one place.
    pub fn session_state(&self) -> CheckoutSessionState {
        CheckoutSessionState {
            id: self.session_id(),
            status: self.data.object.status.clone(),
            payment_status: self.data.object.payment_status.clone(),
            payment_intent_status: None,
        }
    }
}

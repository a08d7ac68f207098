use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::CheckoutSessionId;

/// One line on the hosted checkout page, priced in minor currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutLineItem {
    pub name: String,
    pub description: String,
    pub unit_amount_cents: u32,
    pub quantity: u32,
}

/// Request for a hosted checkout session. Metadata carries the application
/// id and confirmation code so provider events correlate back to the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSessionRequest {
    pub customer_email: String,
    pub line_items: Vec<CheckoutLineItem>,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: BTreeMap<String, String>,
}

/// Newly created session: the stored reference plus the redirect target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: CheckoutSessionId,
    pub url: String,
}

/// Point-in-time session state as reported by the provider.
///
/// Depending on timing the provider may surface success through
/// `payment_status`, the session-level `status`, or only the underlying
/// payment intent, so all three are carried and checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSessionState {
    pub id: CheckoutSessionId,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub payment_intent_status: Option<String>,
}

impl CheckoutSessionState {
    /// Proof-of-payment rule: an explicit paid status, a complete session,
    /// or a succeeded payment intent all count.
    pub fn is_paid(&self) -> bool {
        self.payment_status.as_deref() == Some("paid")
            || self.status.as_deref() == Some("complete")
            || self.payment_intent_status.as_deref() == Some("succeeded")
    }
}

/// Payment provider seam: create a hosted checkout session and re-query a
/// session by its stored reference.
pub trait PaymentGateway: Send + Sync {
    fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, GatewayError>;

    fn retrieve_session(
        &self,
        id: &CheckoutSessionId,
    ) -> Result<CheckoutSessionState, GatewayError>;
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("unknown checkout session {0}")]
    UnknownSession(String),
    #[error("payment provider unavailable: {0}")]
    Unavailable(String),
    #[error("payment provider rejected the request: {0}")]
    Rejected(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(
        status: Option<&str>,
        payment_status: Option<&str>,
        intent: Option<&str>,
    ) -> CheckoutSessionState {
        CheckoutSessionState {
            id: CheckoutSessionId("cs_test".to_string()),
            status: status.map(str::to_string),
            payment_status: payment_status.map(str::to_string),
            payment_intent_status: intent.map(str::to_string),
        }
    }

    #[test]
    fn paid_payment_status_is_proof() {
        assert!(state(Some("open"), Some("paid"), None).is_paid());
    }

    #[test]
    fn complete_session_status_is_proof_even_when_payment_status_lags() {
        assert!(state(Some("complete"), Some("unpaid"), None).is_paid());
    }

    #[test]
    fn succeeded_payment_intent_is_the_second_signal() {
        assert!(state(Some("open"), Some("unpaid"), Some("succeeded")).is_paid());
    }

    #[test]
    fn open_unpaid_session_is_not_proof() {
        assert!(!state(Some("open"), Some("unpaid"), Some("requires_payment_method")).is_paid());
        assert!(!state(None, None, None).is_paid());
    }
}

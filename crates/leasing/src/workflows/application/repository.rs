use serde::{Deserialize, Serialize};

use super::domain::{Application, ApplicationId, CheckoutSessionId, ConfirmationCode, PaymentStatus};
use super::form::DocumentUpload;

/// Insert payload; the backing store assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewApplication {
    pub confirmation_code: ConfirmationCode,
    pub application: Application,
}

/// Stored application row with payment lifecycle metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: ApplicationId,
    pub confirmation_code: ConfirmationCode,
    pub application: Application,
    pub payment_status: PaymentStatus,
    /// Boolean mirror the reporting tables key off.
    pub application_fee_paid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkout_session: Option<CheckoutSessionId>,
}

impl ApplicationRecord {
    pub fn status_view(&self) -> ApplicationStatusView {
        ApplicationStatusView {
            application_id: self.id.clone(),
            confirmation_code: self.confirmation_code.clone(),
            payment_status: self.payment_status.label(),
            total_fee_cents: self.application.total_fee_cents,
        }
    }
}

/// Sanitized representation exposed over the API.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub confirmation_code: ConfirmationCode,
    pub payment_status: &'static str,
    pub total_fee_cents: u64,
}

/// Result of the conditional pending-to-paid transition.
///
/// The repository performs the check-and-set atomically ("set paid where
/// status is pending"), so exactly one caller across the webhook and the
/// verification poller observes [`PaidTransition::Performed`] — and that
/// caller alone triggers the confirmation email.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaidTransition {
    Performed,
    AlreadyPaid,
}

/// Storage abstraction so the service can be exercised in isolation.
pub trait ApplicationRepository: Send + Sync {
    fn insert(&self, application: NewApplication) -> Result<ApplicationRecord, RepositoryError>;
    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError>;
    fn fetch_by_session(
        &self,
        session: &CheckoutSessionId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError>;
    fn set_session_reference(
        &self,
        id: &ApplicationId,
        session: &CheckoutSessionId,
    ) -> Result<(), RepositoryError>;
    /// Atomically transition `pending -> paid`, reporting whether this call
    /// performed the transition or found it already done.
    fn mark_paid(&self, id: &ApplicationId) -> Result<PaidTransition, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Stable reference handed back by the content store for an uploaded
/// identity document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub key: String,
}

/// Content store for identity documents.
pub trait DocumentStore: Send + Sync {
    fn store(&self, upload: &DocumentUpload) -> Result<StoredDocument, DocumentStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentStoreError {
    #[error("content store unavailable: {0}")]
    Unavailable(String),
    #[error("upload rejected: {0}")]
    Rejected(String),
}

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::{EmailConfig, PaymentConfig};

use super::domain::{ApplicationId, ConfirmationCode};
use super::email::{ConfirmationEmail, EmailDelivery};
use super::fees::{FeeBreakdown, FeeSchedule};
use super::form::{ApplicationValidationError, FormState};
use super::gateway::{
    CheckoutLineItem, CheckoutSessionRequest, GatewayError, PaymentGateway,
};
use super::repository::{
    ApplicationRecord, ApplicationRepository, DocumentStore, NewApplication, PaidTransition,
    RepositoryError,
};
use super::steps::{self, Step, StepValidationError};
use super::webhook::{self, EventParseError, SignatureError, WebhookEvent};

/// Service composing the repository, payment gateway, mailer, and document
/// store behind the three boundary operations: submit, webhook completion,
/// and poll-driven verification.
pub struct ApplicationService<R, G, M, D> {
    repository: Arc<R>,
    gateway: Arc<G>,
    mailer: Arc<M>,
    documents: Arc<D>,
    fees: FeeSchedule,
    payments: PaymentConfig,
    email: EmailConfig,
}

/// What the caller needs after a successful submission: where to send the
/// applicant, and the identifiers to show once they return.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReceipt {
    pub application_id: ApplicationId,
    pub confirmation_code: ConfirmationCode,
    pub redirect_url: String,
    pub fee: FeeBreakdown,
}

/// Outcome of one webhook delivery. Every variant is acknowledged to the
/// provider with success; only signature and parse failures are rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// This delivery performed the paid transition and sent the email.
    Processed { application_id: ApplicationId },
    /// The record was already paid; nothing was re-done.
    AlreadyProcessed { application_id: ApplicationId },
    /// No stored application references the session. Logged, still
    /// acknowledged so the provider does not retry forever.
    UnknownSession,
    /// Event type we do not handle, or a session that is not yet paid.
    Ignored,
}

/// Poller-facing verification result. "Not verified" is an expected,
/// retryable outcome and never an error.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VerificationReport {
    pub verified: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation_code: Option<ConfirmationCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applicant_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_fee_cents: Option<u64>,
}

impl VerificationReport {
    fn not_verified(message: &str) -> Self {
        Self {
            verified: false,
            message: message.to_string(),
            confirmation_code: None,
            applicant_name: None,
            total_fee_cents: None,
        }
    }

    fn verified(record: &ApplicationRecord) -> Self {
        Self {
            verified: true,
            message: "payment verified".to_string(),
            confirmation_code: Some(record.confirmation_code.clone()),
            applicant_name: Some(record.application.applicant_name()),
            total_fee_cents: Some(record.application.total_fee_cents),
        }
    }
}

impl<R, G, M, D> ApplicationService<R, G, M, D>
where
    R: ApplicationRepository + 'static,
    G: PaymentGateway + 'static,
    M: EmailDelivery + 'static,
    D: DocumentStore + 'static,
{
    pub fn new(
        repository: Arc<R>,
        gateway: Arc<G>,
        mailer: Arc<M>,
        documents: Arc<D>,
        fees: FeeSchedule,
        payments: PaymentConfig,
        email: EmailConfig,
    ) -> Self {
        Self { repository, gateway, mailer, documents, fees, payments, email }
    }

    pub fn fee_schedule(&self) -> FeeSchedule {
        self.fees
    }

    /// Fee preview for the review step, from the same schedule the checkout
    /// session charges.
    pub fn quote(&self, adult_count: u32, pet_count: u32) -> FeeBreakdown {
        self.fees.quote(adult_count, pet_count)
    }

    /// Submit a validated application: upload identity documents, persist
    /// the pending record with its fee snapshot, open a checkout session,
    /// and hand back the redirect target.
    ///
    /// The record is inserted before the session is requested, so a session
    /// failure still leaves an auditable pending row without a reference.
    pub fn submit(&self, form: &FormState) -> Result<SubmissionReceipt, ApplicationServiceError> {
        for step in Step::ALL {
            if let Err(err) = steps::validate_step(step, form) {
                warn!(step = step.label(), %err, "submission blocked by an incomplete step");
                return Err(err.into());
            }
        }
        steps::ready_to_submit(form)?;

        // Upload failures are tolerated per file; submission proceeds with
        // whichever documents made it.
        let mut document_keys = Vec::with_capacity(form.government_id_files.len());
        for upload in &form.government_id_files {
            match self.documents.store(upload) {
                Ok(stored) => document_keys.push(stored.key),
                Err(err) => {
                    warn!(file = %upload.file_name, %err, "identity document upload failed");
                }
            }
        }

        let confirmation_code = ConfirmationCode::generate(&mut rand::thread_rng());
        let fee = self.fees.quote(form.adult_count(), form.pet_count());
        let application = form.build_application(document_keys, fee.total_fee_cents)?;
        let customer_email = application.email.clone();

        let record = self.repository.insert(NewApplication {
            confirmation_code: confirmation_code.clone(),
            application,
        })?;
        info!(
            application_id = %record.id,
            confirmation = %record.confirmation_code,
            total_fee_cents = fee.total_fee_cents,
            "application persisted, requesting checkout session"
        );

        let session = self
            .gateway
            .create_checkout_session(self.checkout_request(&record.id, &confirmation_code, &fee, customer_email))
            .map_err(|err| {
                // The pending row stays behind without a session reference;
                // recovery is a manual retry flow.
                error!(application_id = %record.id, %err, "checkout session creation failed");
                err
            })?;

        self.repository.set_session_reference(&record.id, &session.id)?;
        info!(application_id = %record.id, session = %session.id.0, "checkout session stored");

        Ok(SubmissionReceipt {
            application_id: record.id,
            confirmation_code,
            redirect_url: session.url,
            fee,
        })
    }

    fn checkout_request(
        &self,
        application_id: &ApplicationId,
        confirmation_code: &ConfirmationCode,
        fee: &FeeBreakdown,
        customer_email: String,
    ) -> CheckoutSessionRequest {
        let mut line_items = vec![CheckoutLineItem {
            name: "Rental Application Fee".to_string(),
            description: format!(
                "Application processing fee for {} adult(s)",
                fee.adult_count
            ),
            unit_amount_cents: self.fees.adult_fee_cents,
            quantity: fee.adult_count,
        }];
        if fee.pet_count > 0 {
            line_items.push(CheckoutLineItem {
                name: "Pet Application Fee".to_string(),
                description: format!("Pet application fee for {} pet(s)", fee.pet_count),
                unit_amount_cents: self.fees.pet_fee_cents,
                quantity: fee.pet_count,
            });
        }

        let mut metadata = BTreeMap::new();
        metadata.insert("application_id".to_string(), application_id.0.clone());
        metadata.insert(
            "confirmation_code".to_string(),
            confirmation_code.as_str().to_string(),
        );

        CheckoutSessionRequest {
            customer_email,
            line_items,
            success_url: self.payments.success_url(&application_id.0),
            cancel_url: self.payments.cancel_url(),
            metadata,
        }
    }

    /// Process one signed webhook delivery against the current clock.
    pub fn handle_webhook(
        &self,
        raw_body: &[u8],
        signature_header: &str,
    ) -> Result<WebhookOutcome, ApplicationServiceError> {
        self.handle_webhook_at(raw_body, signature_header, Utc::now().timestamp())
    }

    /// Clock-injected variant so signature expiry is testable.
    ///
    /// Signature verification happens before the payload is parsed or the
    /// repository is touched. Everything that verifies is acknowledged,
    /// including idempotent re-deliveries and unmatched sessions.
    pub fn handle_webhook_at(
        &self,
        raw_body: &[u8],
        signature_header: &str,
        now_unix: i64,
    ) -> Result<WebhookOutcome, ApplicationServiceError> {
        webhook::verify_signature(
            raw_body,
            signature_header,
            &self.payments.webhook_secret,
            now_unix,
        )?;

        let event = WebhookEvent::parse(raw_body)?;
        if !event.is_checkout_completed() {
            return Ok(WebhookOutcome::Ignored);
        }

        let session_id = event.session_id();
        if !event.session_state().is_paid() {
            info!(session = %session_id.0, "completed session not yet paid, ignoring");
            return Ok(WebhookOutcome::Ignored);
        }

        let record = match self.repository.fetch_by_session(&session_id)? {
            Some(record) => record,
            None => {
                // Reportable inconsistency, not a crash; the provider still
                // gets an acknowledgment.
                warn!(session = %session_id.0, "no application matches webhook session");
                return Ok(WebhookOutcome::UnknownSession);
            }
        };

        match self.repository.mark_paid(&record.id)? {
            PaidTransition::Performed => {
                info!(application_id = %record.id, "webhook marked application paid");
                self.send_confirmation(&record);
                Ok(WebhookOutcome::Processed { application_id: record.id })
            }
            PaidTransition::AlreadyPaid => {
                info!(application_id = %record.id, "webhook re-delivery for paid application");
                Ok(WebhookOutcome::AlreadyProcessed { application_id: record.id })
            }
        }
    }

    /// Poller fallback: re-query the provider and perform the same paid
    /// transition as the webhook when proof of payment is found.
    pub fn verify_payment(
        &self,
        application_id: &ApplicationId,
    ) -> Result<VerificationReport, ApplicationServiceError> {
        let record = match self.repository.fetch(application_id)? {
            Some(record) => record,
            None => {
                warn!(application_id = %application_id, "verification requested for unknown application");
                return Ok(VerificationReport::not_verified("application not found"));
            }
        };

        let session_id = match &record.checkout_session {
            Some(session) => session.clone(),
            None => return Ok(VerificationReport::not_verified("no payment session found")),
        };

        let state = self.gateway.retrieve_session(&session_id)?;
        if !state.is_paid() {
            return Ok(VerificationReport::not_verified("payment not completed"));
        }

        match self.repository.mark_paid(&record.id)? {
            PaidTransition::Performed => {
                info!(application_id = %record.id, "poller fallback marked application paid");
                self.send_confirmation(&record);
            }
            PaidTransition::AlreadyPaid => {
                info!(application_id = %record.id, "payment already processed by webhook");
            }
        }

        Ok(VerificationReport::verified(&record))
    }

    /// Fetch a stored application for status display.
    pub fn get(
        &self,
        application_id: &ApplicationId,
    ) -> Result<ApplicationRecord, ApplicationServiceError> {
        let record = self
            .repository
            .fetch(application_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    /// Best-effort email dispatch: failures are logged and never unwind the
    /// paid transition that triggered them.
    fn send_confirmation(&self, record: &ApplicationRecord) {
        let mail = ConfirmationEmail {
            to: record.application.email.clone(),
            first_name: record.application.first_name.clone(),
            last_name: record.application.last_name.clone(),
            confirmation_code: record.confirmation_code.clone(),
        };

        let message = match mail.render(&self.email.from_address) {
            Ok(message) => message,
            Err(err) => {
                error!(application_id = %record.id, %err, "confirmation email rejected before send");
                return;
            }
        };

        match self.mailer.send(message) {
            Ok(delivery) => {
                info!(application_id = %record.id, delivery = %delivery.0, "confirmation email sent");
            }
            Err(err) => {
                error!(application_id = %record.id, %err, "confirmation email dispatch failed");
            }
        }
    }
}

/// Error raised by the application service.
#[derive(Debug, thiserror::Error)]
pub enum ApplicationServiceError {
    #[error(transparent)]
    Step(#[from] StepValidationError),
    #[error(transparent)]
    Invalid(#[from] ApplicationValidationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Signature(#[from] SignatureError),
    #[error(transparent)]
    EventParse(#[from] EventParseError),
}

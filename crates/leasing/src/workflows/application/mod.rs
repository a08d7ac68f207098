//! Rental application intake and payment confirmation pipeline.
//!
//! The flow runs form state -> step validator -> fee calculator -> submit
//! (persist + checkout session + redirect), then hands off to the hosted
//! checkout page. Two independent paths race to observe the completed
//! payment afterwards: the provider's signed webhook push and the
//! client-triggered verification poll. Both funnel through one conditional
//! pending-to-paid transition, so exactly one of them sends the
//! confirmation email no matter how the race resolves.

pub mod domain;
pub mod email;
pub mod fees;
pub mod form;
pub mod gateway;
pub mod poller;
pub mod repository;
pub mod router;
pub mod service;
pub mod steps;
pub mod webhook;

#[cfg(test)]
mod tests;

pub use domain::{
    Application, ApplicationId, Certifications, CheckoutSessionId, ConfirmationCode,
    EmergencyContact, EmploymentRecord, IdentityVerification, Occupant, PaymentStatus, Pet,
    PetKind, ResidenceHistory, ScreeningAnswer, ScreeningAnswers, Vehicle,
};
pub use email::{ConfirmationEmail, DeliveryId, EmailDelivery, EmailError, EmailMessage};
pub use fees::{FeeBreakdown, FeeSchedule};
pub use form::{
    ApplicationValidationError, DocumentUpload, FormState, FormUpdate, FormUpdateError,
};
pub use gateway::{
    CheckoutLineItem, CheckoutSession, CheckoutSessionRequest, CheckoutSessionState, GatewayError,
    PaymentGateway,
};
pub use poller::{poll_verification, CancelToken, PollOutcome, PollPolicy};
pub use repository::{
    ApplicationRecord, ApplicationRepository, ApplicationStatusView, DocumentStore,
    DocumentStoreError, NewApplication, PaidTransition, RepositoryError, StoredDocument,
};
pub use router::application_router;
pub use service::{
    ApplicationService, ApplicationServiceError, SubmissionReceipt, VerificationReport,
    WebhookOutcome,
};
pub use steps::{advance, ready_to_submit, retreat, validate_step, Step, StepValidationError};
pub use webhook::{
    sign_payload, verify_signature, SignatureError, WebhookEvent, CHECKOUT_COMPLETED_EVENT,
    SIGNATURE_TOLERANCE_SECS,
};

use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::info;

use greenland_leasing::workflows::application::{
    ApplicationId, ApplicationRecord, ApplicationRepository, CheckoutSession, CheckoutSessionId,
    CheckoutSessionRequest, CheckoutSessionState, DeliveryId, DocumentStore, DocumentStoreError,
    DocumentUpload, EmailDelivery, EmailError, EmailMessage, GatewayError, NewApplication,
    PaidTransition, PaymentGateway, PaymentStatus, RepositoryError, StoredDocument,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// In-memory application store used until a database-backed repository ships.
#[derive(Default)]
pub(crate) struct InMemoryApplicationRepository {
    sequence: AtomicU64,
    records: Mutex<HashMap<ApplicationId, ApplicationRecord>>,
}

impl ApplicationRepository for InMemoryApplicationRepository {
    fn insert(&self, application: NewApplication) -> Result<ApplicationRecord, RepositoryError> {
        let id = ApplicationId(format!(
            "app-{:06}",
            self.sequence.fetch_add(1, Ordering::Relaxed) + 1
        ));
        let record = ApplicationRecord {
            id: id.clone(),
            confirmation_code: application.confirmation_code,
            application: application.application,
            payment_status: PaymentStatus::Pending,
            application_fee_paid: false,
            checkout_session: None,
        };
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.insert(id, record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn fetch_by_session(
        &self,
        session: &CheckoutSessionId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .find(|record| record.checkout_session.as_ref() == Some(session))
            .cloned())
    }

    fn set_session_reference(
        &self,
        id: &ApplicationId,
        session: &CheckoutSessionId,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        record.checkout_session = Some(session.clone());
        Ok(())
    }

    fn mark_paid(&self, id: &ApplicationId) -> Result<PaidTransition, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if record.payment_status == PaymentStatus::Paid {
            return Ok(PaidTransition::AlreadyPaid);
        }
        record.payment_status = PaymentStatus::Paid;
        record.application_fee_paid = true;
        Ok(PaidTransition::Performed)
    }
}

/// Stand-in payment gateway: sessions resolve to local checkout URLs and
/// flip to paid on demand, which covers the demo command and local webhook
/// testing.
#[derive(Default)]
pub(crate) struct SimulatedPaymentGateway {
    sequence: AtomicU64,
    paid: Mutex<Vec<CheckoutSessionId>>,
}

impl SimulatedPaymentGateway {
    pub(crate) fn complete_checkout(&self, session: &CheckoutSessionId) {
        self.paid
            .lock()
            .expect("gateway mutex poisoned")
            .push(session.clone());
    }
}

impl PaymentGateway for SimulatedPaymentGateway {
    fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let id = CheckoutSessionId(format!(
            "cs_sim_{:06}",
            self.sequence.fetch_add(1, Ordering::Relaxed) + 1
        ));
        info!(
            session = %id.0,
            customer = %request.customer_email,
            line_items = request.line_items.len(),
            "simulated checkout session created"
        );
        Ok(CheckoutSession {
            url: format!("https://checkout.simulated.local/pay/{}", id.0),
            id,
        })
    }

    fn retrieve_session(
        &self,
        id: &CheckoutSessionId,
    ) -> Result<CheckoutSessionState, GatewayError> {
        let paid = self.paid.lock().expect("gateway mutex poisoned").contains(id);
        Ok(CheckoutSessionState {
            id: id.clone(),
            status: Some(if paid { "complete" } else { "open" }.to_string()),
            payment_status: Some(if paid { "paid" } else { "unpaid" }.to_string()),
            payment_intent_status: None,
        })
    }
}

/// Mailer that records deliveries and logs them instead of calling the
/// provider, keeping local runs side-effect free.
#[derive(Default)]
pub(crate) struct LoggingMailer {
    sequence: AtomicU64,
    sent: Mutex<Vec<EmailMessage>>,
}

impl LoggingMailer {
    pub(crate) fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().expect("mailer mutex poisoned").clone()
    }
}

impl EmailDelivery for LoggingMailer {
    fn send(&self, message: EmailMessage) -> Result<DeliveryId, EmailError> {
        let id = DeliveryId(format!(
            "email-{:06}",
            self.sequence.fetch_add(1, Ordering::Relaxed) + 1
        ));
        info!(
            to = %message.to,
            subject = %message.subject,
            delivery = %id.0,
            "confirmation email captured"
        );
        self.sent.lock().expect("mailer mutex poisoned").push(message);
        Ok(id)
    }
}

/// Keyed in-memory blob store for uploaded identity documents.
#[derive(Default)]
pub(crate) struct InMemoryDocumentStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl DocumentStore for InMemoryDocumentStore {
    fn store(&self, upload: &DocumentUpload) -> Result<StoredDocument, DocumentStoreError> {
        let key = format!("application-documents/{}", upload.file_name);
        self.objects
            .lock()
            .expect("document mutex poisoned")
            .insert(key.clone(), upload.content.clone());
        Ok(StoredDocument { key })
    }
}

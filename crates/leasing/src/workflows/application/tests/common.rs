use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::{EmailConfig, PaymentConfig};
use crate::workflows::application::domain::{
    ApplicationId, CheckoutSessionId, EmergencyContact, PaymentStatus, Pet, PetKind,
    ResidenceHistory,
};
use crate::workflows::application::email::{DeliveryId, EmailDelivery, EmailError, EmailMessage};
use crate::workflows::application::fees::FeeSchedule;
use crate::workflows::application::form::{DocumentUpload, FormState};
use crate::workflows::application::gateway::{
    CheckoutSession, CheckoutSessionRequest, CheckoutSessionState, GatewayError, PaymentGateway,
};
use crate::workflows::application::repository::{
    ApplicationRecord, ApplicationRepository, DocumentStore, DocumentStoreError, NewApplication,
    PaidTransition, RepositoryError, StoredDocument,
};
use crate::workflows::application::service::ApplicationService;
use crate::workflows::application::webhook::sign_payload;

pub(super) const WEBHOOK_SECRET: &str = "whsec_leasing_test";
pub(super) const TEST_NOW_UNIX: i64 = 1_756_500_000;

pub(super) fn payment_config() -> PaymentConfig {
    PaymentConfig {
        secret_key: "sk_test_leasing".to_string(),
        webhook_secret: WEBHOOK_SECRET.to_string(),
        redirect_base_url: "https://apartments.example.test".to_string(),
    }
}

pub(super) fn email_config() -> EmailConfig {
    EmailConfig {
        api_key: "re_test_leasing".to_string(),
        from_address: "Greenland <applications@apartments.example.test>".to_string(),
    }
}

/// A form filled out completely by a citizen applicant, no pets, no
/// additional occupants, every certification accepted.
pub(super) fn complete_form() -> FormState {
    let mut form = FormState::default();
    form.first_name = "Jordan".to_string();
    form.last_name = "Reyes".to_string();
    form.date_of_birth = "1992-04-18".to_string();
    form.phone = "503-555-0117".to_string();
    form.email = "jordan.reyes@example.test".to_string();
    form.is_us_citizen = Some(true);
    form.ssn = "123-45-6789".to_string();
    form.current_residence = ResidenceHistory {
        address: "900 SE Ankeny St".to_string(),
        city: "Portland".to_string(),
        state: "OR".to_string(),
        zip: "97214".to_string(),
        date_moved_in: "2021-06-01".to_string(),
        date_moved_out: String::new(),
        monthly_rent: "1650".to_string(),
        reason_leaving: "Closer to work".to_string(),
        landlord_name: "M. Okafor".to_string(),
        landlord_phone: "503-555-0188".to_string(),
        landlord_email: "landlord@example.test".to_string(),
    };
    form.employment.status = "employed".to_string();
    form.emergency_contact = EmergencyContact {
        first_name: "Casey".to_string(),
        last_name: "Reyes".to_string(),
        relationship: "sibling".to_string(),
        phone: "503-555-0120".to_string(),
        email: String::new(),
        has_unit_access: false,
    };
    form.certifications.true_info = true;
    form.certifications.verify_info = true;
    form.certifications.background_check = true;
    form.certifications.false_info_denial = true;
    form.certifications.non_refundable_fee = true;
    form.certifications.terms = true;
    form
}

pub(super) fn form_with_pets(pet_count: u8) -> FormState {
    let mut form = complete_form();
    form.has_pets = true;
    form.pets_count = pet_count;
    form.pets = (0..pet_count)
        .map(|i| Pet {
            kind: if i % 2 == 0 { PetKind::Dog } else { PetKind::Cat },
            other_description: None,
        })
        .collect();
    form
}

pub(super) fn non_citizen_form() -> FormState {
    let mut form = complete_form();
    form.is_us_citizen = Some(false);
    form.ssn = String::new();
    form.government_id_type = "passport".to_string();
    form.government_id_files = vec![DocumentUpload {
        file_name: "passport.pdf".to_string(),
        content: vec![0x25, 0x50, 0x44, 0x46],
    }];
    form
}

pub(super) type TestService =
    ApplicationService<MemoryRepository, ScriptedGateway, RecordingMailer, MemoryDocuments>;

pub(super) struct TestHarness {
    pub(super) service: TestService,
    pub(super) repository: Arc<MemoryRepository>,
    pub(super) gateway: Arc<ScriptedGateway>,
    pub(super) mailer: Arc<RecordingMailer>,
    pub(super) documents: Arc<MemoryDocuments>,
}

pub(super) fn harness() -> TestHarness {
    let repository = Arc::new(MemoryRepository::default());
    let gateway = Arc::new(ScriptedGateway::default());
    let mailer = Arc::new(RecordingMailer::default());
    let documents = Arc::new(MemoryDocuments::default());
    let service = ApplicationService::new(
        repository.clone(),
        gateway.clone(),
        mailer.clone(),
        documents.clone(),
        FeeSchedule::default(),
        payment_config(),
        email_config(),
    );
    TestHarness { service, repository, gateway, mailer, documents }
}

pub(super) fn shared_harness() -> (Arc<TestService>, TestHarness) {
    let extra = harness();
    let service = Arc::new(ApplicationService::new(
        extra.repository.clone(),
        extra.gateway.clone(),
        extra.mailer.clone(),
        extra.documents.clone(),
        FeeSchedule::default(),
        payment_config(),
        email_config(),
    ));
    (service, extra)
}

/// Signed `checkout.session.completed` payload the way the provider would
/// deliver it.
pub(super) fn paid_webhook(session: &CheckoutSessionId) -> (Vec<u8>, String) {
    let body = serde_json::json!({
        "type": "checkout.session.completed",
        "data": { "object": {
            "id": session.0,
            "status": "complete",
            "payment_status": "paid",
        }},
    })
    .to_string()
    .into_bytes();
    let header = sign_payload(&body, WEBHOOK_SECRET, TEST_NOW_UNIX);
    (body, header)
}

pub(super) async fn read_json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    sequence: AtomicU64,
    records: Mutex<HashMap<ApplicationId, ApplicationRecord>>,
}

impl MemoryRepository {
    pub(super) fn record(&self, id: &ApplicationId) -> Option<ApplicationRecord> {
        self.records.lock().expect("repository mutex poisoned").get(id).cloned()
    }
}

impl ApplicationRepository for MemoryRepository {
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
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .insert(id, record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Ok(self.records.lock().expect("repository mutex poisoned").get(id).cloned())
    }

    fn fetch_by_session(
        &self,
        session: &CheckoutSessionId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .expect("repository mutex poisoned")
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

#[derive(Default)]
struct GatewayState {
    requests: Vec<CheckoutSessionRequest>,
    paid_sessions: Vec<CheckoutSessionId>,
    fail_create: bool,
}

/// Scriptable provider double: sessions are created in order, and a test
/// flips them paid to simulate checkout completion.
#[derive(Default)]
pub(super) struct ScriptedGateway {
    state: Mutex<GatewayState>,
    sequence: AtomicU64,
}

impl ScriptedGateway {
    pub(super) fn complete(&self, session: &CheckoutSessionId) {
        self.state
            .lock()
            .expect("gateway mutex poisoned")
            .paid_sessions
            .push(session.clone());
    }

    pub(super) fn fail_next_create(&self) {
        self.state.lock().expect("gateway mutex poisoned").fail_create = true;
    }

    pub(super) fn requests(&self) -> Vec<CheckoutSessionRequest> {
        self.state.lock().expect("gateway mutex poisoned").requests.clone()
    }
}

impl PaymentGateway for ScriptedGateway {
    fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let mut state = self.state.lock().expect("gateway mutex poisoned");
        if state.fail_create {
            state.fail_create = false;
            return Err(GatewayError::Unavailable("simulated outage".to_string()));
        }
        state.requests.push(request);
        let id = CheckoutSessionId(format!(
            "cs_test_{:04}",
            self.sequence.fetch_add(1, Ordering::Relaxed) + 1
        ));
        Ok(CheckoutSession {
            url: format!("https://checkout.example.test/pay/{}", id.0),
            id,
        })
    }

    fn retrieve_session(
        &self,
        id: &CheckoutSessionId,
    ) -> Result<CheckoutSessionState, GatewayError> {
        let state = self.state.lock().expect("gateway mutex poisoned");
        let paid = state.paid_sessions.contains(id);
        Ok(CheckoutSessionState {
            id: id.clone(),
            status: Some(if paid { "complete" } else { "open" }.to_string()),
            payment_status: Some(if paid { "paid" } else { "unpaid" }.to_string()),
            payment_intent_status: None,
        })
    }
}

#[derive(Default)]
pub(super) struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    fail_sends: Mutex<bool>,
}

impl RecordingMailer {
    pub(super) fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().expect("mailer mutex poisoned").clone()
    }

    pub(super) fn fail_sends(&self) {
        *self.fail_sends.lock().expect("mailer mutex poisoned") = true;
    }
}

impl EmailDelivery for RecordingMailer {
    fn send(&self, message: EmailMessage) -> Result<DeliveryId, EmailError> {
        if *self.fail_sends.lock().expect("mailer mutex poisoned") {
            return Err(EmailError::Unavailable("simulated outage".to_string()));
        }
        let mut guard = self.sent.lock().expect("mailer mutex poisoned");
        guard.push(message);
        Ok(DeliveryId(format!("email-{:04}", guard.len())))
    }
}

#[derive(Default)]
pub(super) struct MemoryDocuments {
    stored: Mutex<Vec<String>>,
    reject_all: Mutex<bool>,
}

impl MemoryDocuments {
    pub(super) fn stored(&self) -> Vec<String> {
        self.stored.lock().expect("document mutex poisoned").clone()
    }

    pub(super) fn reject_all(&self) {
        *self.reject_all.lock().expect("document mutex poisoned") = true;
    }
}

impl DocumentStore for MemoryDocuments {
    fn store(&self, upload: &DocumentUpload) -> Result<StoredDocument, DocumentStoreError> {
        if *self.reject_all.lock().expect("document mutex poisoned") {
            return Err(DocumentStoreError::Unavailable("simulated outage".to_string()));
        }
        let key = format!("application-documents/{}", upload.file_name);
        self.stored.lock().expect("document mutex poisoned").push(key.clone());
        Ok(StoredDocument { key })
    }
}

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier wrapper for stored applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque reference to the payment provider's checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckoutSessionId(pub String);

const CONFIRMATION_ALPHABET: &[u8] = b"ABCDEF0123456789";

/// Human-readable confirmation identifier in `XXXX-XXXX` form over the
/// hex-like alphabet `A-F0-9`.
///
/// Generated once at submission and never regenerated. The space holds
/// 16^8 (~4.3 billion) codes, so for the volume of a single apartment
/// community the collision probability is negligible (a 1% collision
/// chance requires roughly 9,300 stored applications by the birthday
/// bound); uniqueness is not separately enforced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfirmationCode(String);

impl ConfirmationCode {
    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        let mut code = String::with_capacity(9);
        for position in 0..8 {
            if position == 4 {
                code.push('-');
            }
            let index = rng.gen_range(0..CONFIRMATION_ALPHABET.len());
            code.push(CONFIRMATION_ALPHABET[index] as char);
        }
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Accepts a previously issued code, rejecting anything outside the
    /// `[A-F0-9]{4}-[A-F0-9]{4}` shape.
    pub fn parse(raw: &str) -> Option<Self> {
        let bytes = raw.as_bytes();
        if bytes.len() != 9 || bytes[4] != b'-' {
            return None;
        }
        let valid = bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || CONFIRMATION_ALPHABET.contains(b));
        valid.then(|| Self(raw.to_string()))
    }
}

impl fmt::Display for ConfirmationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Payment lifecycle for an application. The only transition in this
/// pipeline is `Pending` to `Paid`, performed at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl PaymentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
        }
    }
}

/// Additional adult or minor sharing the unit with the primary applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupant {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub relationship: String,
    pub will_live_in_unit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PetKind {
    Dog,
    Cat,
    Other,
}

/// Declared pet. A free-text description is only meaningful for
/// [`PetKind::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pet {
    pub kind: PetKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub make: String,
    pub model: String,
    pub year: String,
    pub color: String,
    pub license_plate: String,
    pub state: String,
}

/// One yes/no screening question; the explanation is populated only when
/// the answer is yes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningAnswer {
    pub answer: bool,
    #[serde(default)]
    pub explanation: String,
}

/// The fixed screening questionnaire collected uniformly from every
/// applicant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningAnswers {
    pub sued_for_rent: ScreeningAnswer,
    pub sued_for_damages: ScreeningAnswer,
    pub evicted: ScreeningAnswer,
    pub defaulted_lease: ScreeningAnswer,
    pub judgment: ScreeningAnswer,
    pub bankruptcy: ScreeningAnswer,
    pub felony: ScreeningAnswer,
}

/// Six independent acknowledgments; submission requires all of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certifications {
    pub true_info: bool,
    pub verify_info: bool,
    pub background_check: bool,
    pub false_info_denial: bool,
    pub non_refundable_fee: bool,
    pub terms: bool,
}

impl Certifications {
    pub fn all_accepted(&self) -> bool {
        self.true_info
            && self.verify_info
            && self.background_check
            && self.false_info_denial
            && self.non_refundable_fee
            && self.terms
    }
}

/// Identity verification branch selected by the citizenship flag: citizens
/// provide an SSN, everyone else an ID type plus uploaded documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IdentityVerification {
    SocialSecurity { ssn: String },
    GovernmentId { id_type: String, document_keys: Vec<String> },
}

/// Current (required) or previous (optional) residence block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResidenceHistory {
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub date_moved_in: String,
    #[serde(default)]
    pub date_moved_out: String,
    pub monthly_rent: String,
    pub reason_leaving: String,
    pub landlord_name: String,
    #[serde(default)]
    pub landlord_phone: String,
    #[serde(default)]
    pub landlord_email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmploymentRecord {
    pub status: String,
    #[serde(default)]
    pub employer_name: String,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub supervisor_name: String,
    #[serde(default)]
    pub employer_phone: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub gross_monthly_income: String,
    #[serde(default)]
    pub other_income_source: String,
    #[serde(default)]
    pub other_income_amount: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub first_name: String,
    pub last_name: String,
    pub relationship: String,
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub has_unit_access: bool,
}

/// The persisted application entity: everything the applicant declared plus
/// the fee snapshot and payment lifecycle fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub date_of_birth: String,
    pub is_us_citizen: bool,
    pub identity: IdentityVerification,
    pub additional_occupants: Vec<Occupant>,
    pub current_residence: ResidenceHistory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_residence: Option<ResidenceHistory>,
    pub employment: EmploymentRecord,
    pub screening: ScreeningAnswers,
    pub has_pets: bool,
    pub pets_count: u8,
    pub pets: Vec<Pet>,
    pub pets_caused_damage: bool,
    #[serde(default)]
    pub pets_damage_explanation: String,
    pub emergency_contact: EmergencyContact,
    pub has_vehicle: bool,
    pub vehicles: Vec<Vehicle>,
    pub certifications: Certifications,
    /// Snapshot taken at submission; later fee-schedule changes never touch
    /// stored applications.
    pub total_fee_cents: u64,
}

impl Application {
    /// Primary applicant plus every additional occupant.
    pub fn adult_count(&self) -> u32 {
        1 + self.additional_occupants.len() as u32
    }

    /// Zero unless pets were declared, in which case the declared count.
    pub fn pet_count(&self) -> u32 {
        if self.has_pets {
            u32::from(self.pets_count)
        } else {
            0
        }
    }

    pub fn applicant_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn confirmation_code_matches_pattern() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let code = ConfirmationCode::generate(&mut rng);
            let text = code.as_str();
            assert_eq!(text.len(), 9);
            assert_eq!(&text[4..5], "-");
            for (i, byte) in text.bytes().enumerate() {
                if i == 4 {
                    continue;
                }
                assert!(
                    (b'A'..=b'F').contains(&byte) || byte.is_ascii_digit(),
                    "unexpected character {} in {text}",
                    byte as char
                );
            }
            assert_eq!(ConfirmationCode::parse(text), Some(code));
        }
    }

    #[test]
    fn confirmation_code_parse_rejects_malformed_input() {
        assert!(ConfirmationCode::parse("12345678").is_none());
        assert!(ConfirmationCode::parse("123G-5678").is_none());
        assert!(ConfirmationCode::parse("1234-567").is_none());
        assert!(ConfirmationCode::parse("1234_5678").is_none());
        assert!(ConfirmationCode::parse("abcd-0123").is_none());
    }

    #[test]
    fn certifications_require_every_acknowledgment() {
        let mut certs = Certifications {
            true_info: true,
            verify_info: true,
            background_check: true,
            false_info_denial: true,
            non_refundable_fee: true,
            terms: true,
        };
        assert!(certs.all_accepted());
        certs.non_refundable_fee = false;
        assert!(!certs.all_accepted());
    }

    #[test]
    fn payment_status_labels_are_stable() {
        assert_eq!(PaymentStatus::Pending.label(), "pending");
        assert_eq!(PaymentStatus::Paid.label(), "paid");
    }
}

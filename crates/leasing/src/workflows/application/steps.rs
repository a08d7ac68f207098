use serde::{Deserialize, Serialize};

use super::form::FormState;

/// The five ordered steps of the application form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    PersonalInfo,
    AddressHistory,
    Employment,
    PetsAndContacts,
    ReviewSubmit,
}

impl Step {
    pub const ALL: [Step; 5] = [
        Step::PersonalInfo,
        Step::AddressHistory,
        Step::Employment,
        Step::PetsAndContacts,
        Step::ReviewSubmit,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Step::PersonalInfo => "Personal Info",
            Step::AddressHistory => "Address History",
            Step::Employment => "Employment",
            Step::PetsAndContacts => "Pets & Contacts",
            Step::ReviewSubmit => "Review & Pay",
        }
    }

    fn next(self) -> Option<Step> {
        match self {
            Step::PersonalInfo => Some(Step::AddressHistory),
            Step::AddressHistory => Some(Step::Employment),
            Step::Employment => Some(Step::PetsAndContacts),
            Step::PetsAndContacts => Some(Step::ReviewSubmit),
            Step::ReviewSubmit => None,
        }
    }

    fn previous(self) -> Option<Step> {
        match self {
            Step::PersonalInfo => None,
            Step::AddressHistory => Some(Step::PersonalInfo),
            Step::Employment => Some(Step::AddressHistory),
            Step::PetsAndContacts => Some(Step::Employment),
            Step::ReviewSubmit => Some(Step::PetsAndContacts),
        }
    }
}

/// Validation failure naming the missing field category. The form state is
/// never mutated by a failed gate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[serde(tag = "missing", rename_all = "snake_case")]
pub enum StepValidationError {
    #[error("please fill in all required personal information fields")]
    PersonalInfo,
    #[error("please indicate whether you are a US citizen")]
    CitizenshipFlag,
    #[error("please provide your Social Security Number")]
    SocialSecurityNumber,
    #[error("please select an ID type and upload your government ID")]
    GovernmentId,
    #[error("please fill in all current residence information")]
    CurrentResidence,
    #[error("please select your employment status")]
    EmploymentStatus,
    #[error("please fill in all emergency contact information")]
    EmergencyContact,
    #[error("please accept every certification before submitting")]
    Certifications,
}

/// Check the required-field predicate for one step.
///
/// Step 3 only demands the employment-status selection. The employer
/// sub-fields the form marks required are deliberately not enforced here;
/// that leniency matches the shipped behavior and is kept on purpose.
pub fn validate_step(step: Step, form: &FormState) -> Result<(), StepValidationError> {
    match step {
        Step::PersonalInfo => validate_personal_info(form),
        Step::AddressHistory => validate_address_history(form),
        Step::Employment => {
            if form.employment.status.trim().is_empty() {
                return Err(StepValidationError::EmploymentStatus);
            }
            Ok(())
        }
        Step::PetsAndContacts => validate_emergency_contact(form),
        // Terminal step: submission is separately gated on certifications.
        Step::ReviewSubmit => Ok(()),
    }
}

/// Forward navigation: permitted only when the current step validates.
pub fn advance(step: Step, form: &FormState) -> Result<Step, StepValidationError> {
    validate_step(step, form)?;
    Ok(step.next().unwrap_or(step))
}

/// Backward navigation is always permitted and validates nothing.
pub fn retreat(step: Step) -> Step {
    step.previous().unwrap_or(step)
}

/// Submission gate on the review step: all six certifications must hold.
pub fn ready_to_submit(form: &FormState) -> Result<(), StepValidationError> {
    if form.certifications.all_accepted() {
        Ok(())
    } else {
        Err(StepValidationError::Certifications)
    }
}

fn validate_personal_info(form: &FormState) -> Result<(), StepValidationError> {
    let required = [
        &form.first_name,
        &form.last_name,
        &form.date_of_birth,
        &form.phone,
        &form.email,
    ];
    if required.iter().any(|field| field.trim().is_empty()) {
        return Err(StepValidationError::PersonalInfo);
    }

    match form.is_us_citizen {
        None => Err(StepValidationError::CitizenshipFlag),
        Some(true) if form.ssn.trim().is_empty() => {
            Err(StepValidationError::SocialSecurityNumber)
        }
        Some(false)
            if form.government_id_type.trim().is_empty()
                || form.government_id_files.is_empty() =>
        {
            Err(StepValidationError::GovernmentId)
        }
        Some(_) => Ok(()),
    }
}

fn validate_address_history(form: &FormState) -> Result<(), StepValidationError> {
    let current = &form.current_residence;
    let required = [
        &current.address,
        &current.city,
        &current.state,
        &current.zip,
        &current.date_moved_in,
        &current.monthly_rent,
        &current.reason_leaving,
        &current.landlord_name,
        &current.landlord_phone,
        &current.landlord_email,
    ];
    // Previous residence is entirely optional; no predicate applies.
    if required.iter().any(|field| field.trim().is_empty()) {
        return Err(StepValidationError::CurrentResidence);
    }
    Ok(())
}

fn validate_emergency_contact(form: &FormState) -> Result<(), StepValidationError> {
    let contact = &form.emergency_contact;
    let required = [
        &contact.first_name,
        &contact.last_name,
        &contact.relationship,
        &contact.phone,
    ];
    if required.iter().any(|field| field.trim().is_empty()) {
        return Err(StepValidationError::EmergencyContact);
    }
    Ok(())
}

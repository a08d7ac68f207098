use serde::{Deserialize, Serialize};

use super::domain::{
    Application, Certifications, EmergencyContact, EmploymentRecord, IdentityVerification,
    Occupant, Pet, PetKind, ResidenceHistory, ScreeningAnswer, ScreeningAnswers, Vehicle,
};

/// An identity document selected by the applicant but not yet uploaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentUpload {
    pub file_name: String,
    #[serde(default)]
    pub content: Vec<u8>,
}

/// Everything the applicant has entered across the five steps.
///
/// [`FormState::default`] is the documented empty baseline: empty strings
/// and lists, `None` for the tri-state citizenship flag, `false` booleans,
/// and a zero pet count. Mutation goes through [`FormState::apply`], which
/// changes exactly the addressed field and leaves every other entry (and the
/// order of untouched collection entries) intact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormState {
    // Step 1: personal information
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub phone: String,
    pub email: String,
    pub is_us_citizen: Option<bool>,
    pub ssn: String,
    pub government_id_type: String,
    pub government_id_files: Vec<DocumentUpload>,
    pub additional_occupants: Vec<Occupant>,

    // Step 2: address and rental history
    pub current_residence: ResidenceHistory,
    pub previous_residence: Option<ResidenceHistory>,

    // Step 3: employment, income, screening
    pub employment: EmploymentRecord,
    pub screening: ScreeningAnswers,

    // Step 4: pets, emergency contact, vehicles
    pub has_pets: bool,
    pub pets_count: u8,
    pub pets: Vec<Pet>,
    pub pets_caused_damage: bool,
    pub pets_damage_explanation: String,
    pub emergency_contact: EmergencyContact,
    pub has_vehicle: bool,
    pub vehicles: Vec<Vehicle>,

    // Step 5: certifications
    pub certifications: Certifications,
}

/// Single-field mutation addressed by key. Block-shaped fields (residence,
/// employment, screening, emergency contact, certifications) update as one
/// record; the three collections support append, remove-by-position, and
/// replace-by-position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum FormUpdate {
    FirstName(String),
    LastName(String),
    DateOfBirth(String),
    Phone(String),
    Email(String),
    IsUsCitizen(Option<bool>),
    Ssn(String),
    GovernmentIdType(String),
    AttachIdDocument(DocumentUpload),
    RemoveIdDocument(usize),
    AddOccupant(Occupant),
    RemoveOccupant(usize),
    ReplaceOccupant(usize, Occupant),
    CurrentResidence(ResidenceHistory),
    PreviousResidence(Option<ResidenceHistory>),
    Employment(EmploymentRecord),
    Screening(ScreeningAnswers),
    HasPets(bool),
    PetsCount(u8),
    AddPet(Pet),
    RemovePet(usize),
    ReplacePet(usize, Pet),
    PetsCausedDamage { answer: bool, explanation: String },
    EmergencyContact(EmergencyContact),
    HasVehicle(bool),
    AddVehicle(Vehicle),
    RemoveVehicle(usize),
    ReplaceVehicle(usize, Vehicle),
    Certifications(Certifications),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FormUpdateError {
    #[error("no entry at position {index} in {collection}")]
    IndexOutOfRange { collection: &'static str, index: usize },
}

/// Construction-time violations caught when turning form state into the
/// persisted entity.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ApplicationValidationError {
    #[error("citizenship must be declared before submission")]
    CitizenshipUndeclared,
    #[error("declared pet count {declared} must be between 1 and 5")]
    PetCountOutOfRange { declared: u8 },
    #[error("declared pet count {declared} does not match {listed} listed pets")]
    PetListMismatch { declared: u8, listed: usize },
    #[error("pets of type 'other' need a description")]
    OtherPetNeedsDescription,
    #[error("screening question '{question}' answered yes needs an explanation")]
    ScreeningExplanationRequired { question: &'static str },
}

fn validate_screening(screening: &ScreeningAnswers) -> Result<(), ApplicationValidationError> {
    let questions: [(&'static str, &ScreeningAnswer); 7] = [
        ("sued_for_rent", &screening.sued_for_rent),
        ("sued_for_damages", &screening.sued_for_damages),
        ("evicted", &screening.evicted),
        ("defaulted_lease", &screening.defaulted_lease),
        ("judgment", &screening.judgment),
        ("bankruptcy", &screening.bankruptcy),
        ("felony", &screening.felony),
    ];
    for (question, entry) in questions {
        if entry.answer && entry.explanation.trim().is_empty() {
            return Err(ApplicationValidationError::ScreeningExplanationRequired { question });
        }
    }
    Ok(())
}

impl FormState {
    /// Apply one update, producing the next state. Failed updates leave the
    /// previous state available to the caller unchanged.
    pub fn apply(mut self, update: FormUpdate) -> Result<Self, FormUpdateError> {
        match update {
            FormUpdate::FirstName(value) => self.first_name = value,
            FormUpdate::LastName(value) => self.last_name = value,
            FormUpdate::DateOfBirth(value) => self.date_of_birth = value,
            FormUpdate::Phone(value) => self.phone = value,
            FormUpdate::Email(value) => self.email = value,
            FormUpdate::IsUsCitizen(value) => self.is_us_citizen = value,
            FormUpdate::Ssn(value) => self.ssn = value,
            FormUpdate::GovernmentIdType(value) => self.government_id_type = value,
            FormUpdate::AttachIdDocument(upload) => self.government_id_files.push(upload),
            FormUpdate::RemoveIdDocument(index) => {
                Self::remove_at(&mut self.government_id_files, "government_id_files", index)?;
            }
            FormUpdate::AddOccupant(occupant) => self.additional_occupants.push(occupant),
            FormUpdate::RemoveOccupant(index) => {
                Self::remove_at(&mut self.additional_occupants, "additional_occupants", index)?;
            }
            FormUpdate::ReplaceOccupant(index, occupant) => {
                Self::replace_at(
                    &mut self.additional_occupants,
                    "additional_occupants",
                    index,
                    occupant,
                )?;
            }
            FormUpdate::CurrentResidence(residence) => self.current_residence = residence,
            FormUpdate::PreviousResidence(residence) => self.previous_residence = residence,
            FormUpdate::Employment(employment) => self.employment = employment,
            FormUpdate::Screening(screening) => self.screening = screening,
            FormUpdate::HasPets(value) => {
                self.has_pets = value;
                // Clearing the flag empties the declaration so the pets-len
                // invariant holds for hasPets == false.
                if !value {
                    self.pets_count = 0;
                    self.pets.clear();
                }
            }
            FormUpdate::PetsCount(count) => self.pets_count = count,
            FormUpdate::AddPet(pet) => self.pets.push(pet),
            FormUpdate::RemovePet(index) => {
                Self::remove_at(&mut self.pets, "pets", index)?;
            }
            FormUpdate::ReplacePet(index, pet) => {
                Self::replace_at(&mut self.pets, "pets", index, pet)?;
            }
            FormUpdate::PetsCausedDamage { answer, explanation } => {
                self.pets_caused_damage = answer;
                self.pets_damage_explanation = if answer { explanation } else { String::new() };
            }
            FormUpdate::EmergencyContact(contact) => self.emergency_contact = contact,
            FormUpdate::HasVehicle(value) => {
                self.has_vehicle = value;
                if !value {
                    self.vehicles.clear();
                }
            }
            FormUpdate::AddVehicle(vehicle) => self.vehicles.push(vehicle),
            FormUpdate::RemoveVehicle(index) => {
                Self::remove_at(&mut self.vehicles, "vehicles", index)?;
            }
            FormUpdate::ReplaceVehicle(index, vehicle) => {
                Self::replace_at(&mut self.vehicles, "vehicles", index, vehicle)?;
            }
            FormUpdate::Certifications(certifications) => self.certifications = certifications,
        }
        Ok(self)
    }

    /// Adult count the fee preview uses: the primary applicant plus every
    /// additional occupant.
    pub fn adult_count(&self) -> u32 {
        1 + self.additional_occupants.len() as u32
    }

    /// Declared pets only count once the has-pets flag is set.
    pub fn pet_count(&self) -> u32 {
        if self.has_pets {
            u32::from(self.pets_count)
        } else {
            0
        }
    }

    /// Build the persisted entity from the completed form, enforcing the
    /// invariants the loose form state cannot: exactly one identity branch,
    /// a pets list that matches the declared count (bounded 1 through 5),
    /// descriptions for "other" pets, and explanations for every screening
    /// question answered yes.
    pub fn build_application(
        &self,
        document_keys: Vec<String>,
        total_fee_cents: u64,
    ) -> Result<Application, ApplicationValidationError> {
        let is_us_citizen = self
            .is_us_citizen
            .ok_or(ApplicationValidationError::CitizenshipUndeclared)?;

        let identity = if is_us_citizen {
            IdentityVerification::SocialSecurity { ssn: self.ssn.clone() }
        } else {
            IdentityVerification::GovernmentId {
                id_type: self.government_id_type.clone(),
                document_keys,
            }
        };

        if self.has_pets {
            if !(1..=5).contains(&self.pets_count) {
                return Err(ApplicationValidationError::PetCountOutOfRange {
                    declared: self.pets_count,
                });
            }
            if usize::from(self.pets_count) != self.pets.len() {
                return Err(ApplicationValidationError::PetListMismatch {
                    declared: self.pets_count,
                    listed: self.pets.len(),
                });
            }
            for pet in &self.pets {
                let missing_description = pet.kind == PetKind::Other
                    && pet
                        .other_description
                        .as_deref()
                        .map_or(true, |text| text.trim().is_empty());
                if missing_description {
                    return Err(ApplicationValidationError::OtherPetNeedsDescription);
                }
            }
        } else if !self.pets.is_empty() {
            return Err(ApplicationValidationError::PetListMismatch {
                declared: 0,
                listed: self.pets.len(),
            });
        }

        validate_screening(&self.screening)?;

        Ok(Application {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            date_of_birth: self.date_of_birth.clone(),
            is_us_citizen,
            identity,
            additional_occupants: self.additional_occupants.clone(),
            current_residence: self.current_residence.clone(),
            previous_residence: self.previous_residence.clone(),
            employment: self.employment.clone(),
            screening: self.screening.clone(),
            has_pets: self.has_pets,
            pets_count: if self.has_pets { self.pets_count } else { 0 },
            pets: self.pets.clone(),
            pets_caused_damage: self.pets_caused_damage,
            pets_damage_explanation: self.pets_damage_explanation.clone(),
            emergency_contact: self.emergency_contact.clone(),
            has_vehicle: self.has_vehicle,
            vehicles: self.vehicles.clone(),
            certifications: self.certifications,
            total_fee_cents,
        })
    }

    fn remove_at<T>(
        entries: &mut Vec<T>,
        collection: &'static str,
        index: usize,
    ) -> Result<(), FormUpdateError> {
        if index >= entries.len() {
            return Err(FormUpdateError::IndexOutOfRange { collection, index });
        }
        entries.remove(index);
        Ok(())
    }

    fn replace_at<T>(
        entries: &mut [T],
        collection: &'static str,
        index: usize,
        value: T,
    ) -> Result<(), FormUpdateError> {
        match entries.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(FormUpdateError::IndexOutOfRange { collection, index }),
        }
    }
}

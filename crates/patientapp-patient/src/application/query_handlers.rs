//! Query handlers for the Patient context.

use chrono::NaiveDate;
use patientapp_core::clock::Clock;
use patientapp_core::error::DomainError;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::Patient;
use crate::domain::repository::PatientRepository;
use crate::domain::value_objects::MedicalAidDetails;

/// Read-only view of a patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatientProfile {
    /// The patient identifier.
    pub patient_id: Uuid,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Contact email.
    pub email: String,
    /// Date of birth.
    pub date_of_birth: NaiveDate,
    /// Age in whole years today.
    pub age: u32,
    /// Medicare and private health fund details.
    pub medical_aid: MedicalAidDetails,
    /// Committed version.
    pub version: i64,
}

impl PatientProfile {
    pub(crate) fn of(patient: &Patient, today: NaiveDate) -> Self {
        Self {
            patient_id: patient.id,
            first_name: patient.first_name.clone(),
            last_name: patient.last_name.clone(),
            email: patient.email.clone(),
            date_of_birth: patient.date_of_birth,
            age: patient.age_on(today),
            medical_aid: patient.medical_aid.clone(),
            version: patient.version,
        }
    }
}

/// Retrieves the profile of the patient registered with `email`.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if no patient uses the email.
/// Returns `DomainError::Infrastructure` if the lookup fails.
pub async fn handle_get_patient_by_email(
    email: &str,
    clock: &dyn Clock,
    repo: &dyn PatientRepository,
) -> Result<PatientProfile, DomainError> {
    let patient = repo
        .find_by_email(email)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("patient with email {email}")))?;
    Ok(PatientProfile::of(&patient, clock.today()))
}

/// Retrieves a patient by its aggregate ID.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no patient has the ID.
/// Returns `DomainError::Infrastructure` if the lookup fails.
pub async fn handle_get_patient_by_id(
    patient_id: Uuid,
    clock: &dyn Clock,
    repo: &dyn PatientRepository,
) -> Result<PatientProfile, DomainError> {
    let patient = repo
        .find_by_id(patient_id)
        .await?
        .ok_or(DomainError::AggregateNotFound(patient_id))?;
    Ok(PatientProfile::of(&patient, clock.today()))
}

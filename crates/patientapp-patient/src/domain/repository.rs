//! Repository seam for patient state.

use async_trait::async_trait;
use patientapp_core::error::DomainError;
use patientapp_core::unit_of_work::Transaction;
use uuid::Uuid;

use super::aggregates::Patient;

/// Loads patients and stages their state writes into a unit of work.
///
/// Writes never commit on their own; they become durable together with the
/// outbox records when the unit of work commits.
#[async_trait]
pub trait PatientRepository: Send + Sync {
    /// Loads a patient by identifier.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Patient>, DomainError>;

    /// Loads a patient by email, ignoring case.
    async fn find_by_email(&self, email: &str) -> Result<Option<Patient>, DomainError>;

    /// Stages the insertion of a newly registered patient at its next
    /// version.
    ///
    /// Returns `DomainError::Conflict` if the email is already taken.
    async fn insert(
        &self,
        tx: &mut dyn Transaction,
        patient: &Patient,
    ) -> Result<(), DomainError>;

    /// Stages an update of an existing patient, moving it from its loaded
    /// version to its next version.
    ///
    /// Returns `DomainError::ConcurrencyConflict` if the stored version no
    /// longer matches the loaded one.
    async fn update(
        &self,
        tx: &mut dyn Transaction,
        patient: &Patient,
    ) -> Result<(), DomainError>;
}

//! Shared test helpers for Patient context integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use patientapp_core::aggregate::AggregateRoot;
use patientapp_core::error::DomainError;
use patientapp_core::unit_of_work::Transaction;
use patientapp_patient::domain::aggregates::{Patient, PatientSnapshot};
use patientapp_patient::domain::commands::RegisterPatient;
use patientapp_patient::domain::repository::PatientRepository;
use patientapp_test_support::{FixedClock, InMemoryOutbox, InMemoryTransaction};
use uuid::Uuid;

const TABLE: &str = "patients";

/// Fixed clock used across patient tests.
pub fn fixed_clock() -> FixedClock {
    FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
}

/// A valid registration command for `email`.
pub fn register_command(email: &str) -> RegisterPatient {
    RegisterPatient {
        correlation_id: Uuid::new_v4(),
        patient_id: Uuid::new_v4(),
        first_name: "Jane".to_owned(),
        last_name: "Citizen".to_owned(),
        date_of_birth: NaiveDate::from_ymd_opt(1990, 6, 30).unwrap(),
        email: email.to_owned(),
        medicare_number: "2123456701".to_owned(),
        medicare_reference: 1,
    }
}

/// Patient repository that keeps snapshots as rows of an `InMemoryOutbox`,
/// so patient state and outbox records commit in the same transaction.
#[derive(Debug, Clone)]
pub struct InMemoryPatientRepository {
    store: InMemoryOutbox,
}

impl InMemoryPatientRepository {
    pub fn new(store: InMemoryOutbox) -> Self {
        Self { store }
    }

    /// Overwrites the committed version of a patient, simulating a
    /// concurrent writer.
    pub async fn bump_version(&self, id: Uuid, version: i64) {
        let mut snapshot: PatientSnapshot =
            serde_json::from_value(self.store.row(TABLE, id).unwrap()).unwrap();
        snapshot.version = version;
        let mut tx = self.store.begin_in_memory();
        tx.stage_row(TABLE, id, serde_json::to_value(snapshot).unwrap());
        tx.commit().await.unwrap();
    }

    fn snapshots(&self) -> Vec<PatientSnapshot> {
        self.store
            .rows(TABLE)
            .into_iter()
            .map(|v| serde_json::from_value(v).unwrap())
            .collect()
    }
}

fn in_memory(tx: &mut dyn Transaction) -> Result<&mut InMemoryTransaction, DomainError> {
    tx.as_any_mut()
        .downcast_mut::<InMemoryTransaction>()
        .ok_or_else(|| DomainError::Infrastructure("expected an InMemoryTransaction".into()))
}

fn stage(tx: &mut InMemoryTransaction, patient: &Patient) {
    let mut snapshot = patient.snapshot();
    snapshot.version = patient.next_version();
    tx.stage_row(TABLE, patient.id, serde_json::to_value(snapshot).unwrap());
}

#[async_trait]
impl PatientRepository for InMemoryPatientRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Patient>, DomainError> {
        Ok(self
            .store
            .row(TABLE, id)
            .map(|v| Patient::restore(serde_json::from_value(v).unwrap())))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Patient>, DomainError> {
        let wanted = email.trim().to_lowercase();
        Ok(self
            .snapshots()
            .into_iter()
            .find(|s| s.email.to_lowercase() == wanted)
            .map(Patient::restore))
    }

    async fn insert(
        &self,
        tx: &mut dyn Transaction,
        patient: &Patient,
    ) -> Result<(), DomainError> {
        let wanted = patient.email().to_lowercase();
        if self.snapshots().iter().any(|s| s.email.to_lowercase() == wanted) {
            return Err(DomainError::Conflict(format!(
                "a patient with email {} already exists",
                patient.email()
            )));
        }
        stage(in_memory(tx)?, patient);
        Ok(())
    }

    async fn update(
        &self,
        tx: &mut dyn Transaction,
        patient: &Patient,
    ) -> Result<(), DomainError> {
        let tx = in_memory(tx)?;
        let stored: PatientSnapshot = tx
            .read_row(TABLE, patient.id)
            .map(|v| serde_json::from_value(v).unwrap())
            .ok_or(DomainError::AggregateNotFound(patient.id))?;
        if stored.version != patient.version() {
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id: patient.id,
                expected: patient.version(),
                actual: stored.version,
            });
        }
        stage(tx, patient);
        Ok(())
    }
}

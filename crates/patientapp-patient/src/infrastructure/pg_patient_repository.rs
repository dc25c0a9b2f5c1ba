//! `PostgreSQL` implementation of `PatientRepository`.

use async_trait::async_trait;
use chrono::NaiveDate;
use patientapp_core::error::DomainError;
use patientapp_core::unit_of_work::Transaction;
use patientapp_outbox_store::error::{SqlxResultExt, is_unique_violation};
use patientapp_outbox_store::pg_transaction::PgTransactionExt;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::domain::aggregates::{Patient, PatientSnapshot};
use crate::domain::repository::PatientRepository;
use crate::domain::value_objects::MedicalAidDetails;

#[derive(Debug, FromRow)]
struct PatientRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    date_of_birth: NaiveDate,
    medical_aid: Json<MedicalAidDetails>,
    version: i64,
}

impl From<PatientRow> for Patient {
    fn from(row: PatientRow) -> Self {
        Patient::restore(PatientSnapshot {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            date_of_birth: row.date_of_birth,
            medical_aid: row.medical_aid.0,
            version: row.version,
        })
    }
}

/// PostgreSQL-backed patient repository.
///
/// Reads go through the pool; writes go through the unit-of-work
/// transaction so they commit together with the outbox records.
#[derive(Debug, Clone)]
pub struct PgPatientRepository {
    pool: PgPool,
}

impl PgPatientRepository {
    /// Creates a new `PgPatientRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PatientRepository for PgPatientRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Patient>, DomainError> {
        let row = sqlx::query_as::<_, PatientRow>(
            r"
            SELECT id, first_name, last_name, email, date_of_birth, medical_aid, version
            FROM patients
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_infra("find patient by id")?;

        Ok(row.map(Patient::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Patient>, DomainError> {
        let row = sqlx::query_as::<_, PatientRow>(
            r"
            SELECT id, first_name, last_name, email, date_of_birth, medical_aid, version
            FROM patients
            WHERE LOWER(email) = LOWER($1)
            ",
        )
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await
        .map_infra("find patient by email")?;

        Ok(row.map(Patient::from))
    }

    async fn insert(
        &self,
        tx: &mut dyn Transaction,
        patient: &Patient,
    ) -> Result<(), DomainError> {
        let conn = tx.as_pg()?.connection()?;
        let result = sqlx::query(
            r"
            INSERT INTO patients
                (id, first_name, last_name, email, date_of_birth, medical_aid, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(patient.id)
        .bind(&patient.first_name)
        .bind(&patient.last_name)
        .bind(&patient.email)
        .bind(patient.date_of_birth)
        .bind(Json(&patient.medical_aid))
        .bind(patient.next_version())
        .execute(&mut *conn)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(DomainError::Conflict(format!(
                "a patient with email {} already exists",
                patient.email
            ))),
            Err(e) => Err(e).map_infra("insert patient"),
        }
    }

    async fn update(
        &self,
        tx: &mut dyn Transaction,
        patient: &Patient,
    ) -> Result<(), DomainError> {
        let conn = tx.as_pg()?.connection()?;
        let result = sqlx::query(
            r"
            UPDATE patients
            SET first_name = $3, last_name = $4, email = $5, date_of_birth = $6,
                medical_aid = $7, version = $8
            WHERE id = $1 AND version = $2
            ",
        )
        .bind(patient.id)
        .bind(patient.version)
        .bind(&patient.first_name)
        .bind(&patient.last_name)
        .bind(&patient.email)
        .bind(patient.date_of_birth)
        .bind(Json(&patient.medical_aid))
        .bind(patient.next_version())
        .execute(&mut *conn)
        .await
        .map_infra("update patient")?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let actual: Option<i64> = sqlx::query_scalar("SELECT version FROM patients WHERE id = $1")
            .bind(patient.id)
            .fetch_optional(&mut *conn)
            .await
            .map_infra("load patient version")?;

        match actual {
            Some(actual) => Err(DomainError::ConcurrencyConflict {
                aggregate_id: patient.id,
                expected: patient.version,
                actual,
            }),
            None => Err(DomainError::AggregateNotFound(patient.id)),
        }
    }
}

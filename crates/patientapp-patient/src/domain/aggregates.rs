//! Aggregate roots for the Patient context.

use chrono::{Datelike, NaiveDate};
use patientapp_core::aggregate::{AggregateRoot, EventBuffer};
use patientapp_core::clock::Clock;
use patientapp_core::context::CorrelationContext;
use patientapp_core::error::DomainError;
use patientapp_core::event::EventMetadata;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::{
    MEDICARE_DETAILS_ADDED, MedicareDetailsAdded, PATIENT_REGISTERED,
    PRIVATE_HEALTH_FUND_ACCOUNT_ADDED, PatientEvent, PatientEventKind, PatientRegistered,
    PrivateHealthFundAccountAdded,
};
use super::value_objects::{MedicalAidDetails, PrivateHealthFundAccount};

/// Persisted state of a patient, without pending events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientSnapshot {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Contact email, unique across patients ignoring case.
    pub email: String,
    /// Date of birth.
    pub date_of_birth: NaiveDate,
    /// Medicare and private health fund details.
    pub medical_aid: MedicalAidDetails,
    /// Number of events committed for this patient.
    pub version: i64,
}

/// Input for registering a new patient.
#[derive(Debug, Clone)]
pub struct Registration {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Contact email.
    pub email: String,
    /// Date of birth.
    pub date_of_birth: NaiveDate,
    /// Medicare card number.
    pub medicare_card_number: String,
    /// Position of the patient on the Medicare card.
    pub medicare_card_reference_number: i32,
}

/// The aggregate root for a patient.
#[derive(Debug)]
pub struct Patient {
    /// Aggregate identifier.
    pub id: Uuid,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) email: String,
    pub(crate) date_of_birth: NaiveDate,
    pub(crate) medical_aid: MedicalAidDetails,
    /// Number of events committed for this patient.
    pub(crate) version: i64,
    events: EventBuffer<PatientEvent>,
}

impl Patient {
    /// Registers a new patient, raising `PatientRegistered` followed by
    /// `MedicareDetailsAdded`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if a name is blank, the email is
    /// malformed, the date of birth lies in the future, or the Medicare
    /// details are invalid.
    pub fn register(
        id: Uuid,
        registration: &Registration,
        ctx: &CorrelationContext,
        clock: &dyn Clock,
    ) -> Result<Self, DomainError> {
        let first_name = registration.first_name.trim();
        let last_name = registration.last_name.trim();
        let email = registration.email.trim();

        if first_name.is_empty() || last_name.is_empty() {
            return Err(DomainError::Validation(
                "first and last name must not be empty".into(),
            ));
        }
        if !is_plausible_email(email) {
            return Err(DomainError::Validation(format!(
                "'{email}' is not a valid email address"
            )));
        }
        if registration.date_of_birth > clock.today() {
            return Err(DomainError::Validation(
                "date of birth must not be in the future".into(),
            ));
        }

        let mut patient = Self {
            id,
            first_name: first_name.to_owned(),
            last_name: last_name.to_owned(),
            email: email.to_owned(),
            date_of_birth: registration.date_of_birth,
            medical_aid: MedicalAidDetails::default(),
            version: 0,
            events: EventBuffer::new(),
        };

        patient.raise(
            PATIENT_REGISTERED,
            PatientEventKind::PatientRegistered(PatientRegistered {
                patient_id: id,
                email: email.to_owned(),
            }),
            ctx,
            clock,
        );
        patient.add_medicare_details(
            &registration.medicare_card_number,
            registration.medicare_card_reference_number,
            ctx,
            clock,
        )?;

        Ok(patient)
    }

    /// Rebuilds a patient from persisted state, with an empty event buffer.
    #[must_use]
    pub fn restore(snapshot: PatientSnapshot) -> Self {
        Self {
            id: snapshot.id,
            first_name: snapshot.first_name,
            last_name: snapshot.last_name,
            email: snapshot.email,
            date_of_birth: snapshot.date_of_birth,
            medical_aid: snapshot.medical_aid,
            version: snapshot.version,
            events: EventBuffer::new(),
        }
    }

    /// Returns the persisted state of this patient.
    #[must_use]
    pub fn snapshot(&self) -> PatientSnapshot {
        PatientSnapshot {
            id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            date_of_birth: self.date_of_birth,
            medical_aid: self.medical_aid.clone(),
            version: self.version,
        }
    }

    /// Records Medicare card details, replacing any previous ones.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the card number is blank or the
    /// reference number is not positive.
    pub fn add_medicare_details(
        &mut self,
        card_number: &str,
        reference_number: i32,
        ctx: &CorrelationContext,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        let card_number = card_number.trim();
        if card_number.is_empty() {
            return Err(DomainError::Validation(
                "Medicare card number must not be empty".into(),
            ));
        }
        if reference_number <= 0 {
            return Err(DomainError::Validation(
                "Medicare card reference number must be a positive integer".into(),
            ));
        }

        self.medical_aid.medicare_card_number = Some(card_number.to_owned());
        self.medical_aid.medicare_card_reference_number = Some(reference_number);
        self.raise(
            MEDICARE_DETAILS_ADDED,
            PatientEventKind::MedicareDetailsAdded(MedicareDetailsAdded {
                patient_id: self.id,
                medicare_card_number: card_number.to_owned(),
                medicare_card_reference_number: reference_number,
            }),
            ctx,
            clock,
        );
        Ok(())
    }

    /// Adds a private health fund account.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if either field is blank, and
    /// `DomainError::Conflict` if the patient already has an account with
    /// the same provider and number (ignoring case).
    pub fn add_private_health_fund_account(
        &mut self,
        provider_name: &str,
        account_number: &str,
        ctx: &CorrelationContext,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        let provider_name = provider_name.trim();
        let account_number = account_number.trim();
        if provider_name.is_empty() || account_number.is_empty() {
            return Err(DomainError::Validation(
                "provider name and account number must not be empty".into(),
            ));
        }
        if self.medical_aid.has_account(provider_name, account_number) {
            return Err(DomainError::Conflict(
                "the private health fund account already exists".into(),
            ));
        }

        self.medical_aid
            .private_health_fund_accounts
            .push(PrivateHealthFundAccount {
                provider_name: provider_name.to_owned(),
                account_number: account_number.to_owned(),
            });
        self.raise(
            PRIVATE_HEALTH_FUND_ACCOUNT_ADDED,
            PatientEventKind::PrivateHealthFundAccountAdded(PrivateHealthFundAccountAdded {
                patient_id: self.id,
                provider_name: provider_name.to_owned(),
                account_number: account_number.to_owned(),
            }),
            ctx,
            clock,
        );
        Ok(())
    }

    /// Age in whole years on `date`. Zero for dates before the birth date.
    #[must_use]
    pub fn age_on(&self, date: NaiveDate) -> u32 {
        let dob = self.date_of_birth;
        let mut age = date.year() - dob.year();
        if (date.month(), date.day()) < (dob.month(), dob.day()) {
            age -= 1;
        }
        u32::try_from(age).unwrap_or(0)
    }

    /// Given name.
    #[must_use]
    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    /// Family name.
    #[must_use]
    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    /// Contact email.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Date of birth.
    #[must_use]
    pub fn date_of_birth(&self) -> NaiveDate {
        self.date_of_birth
    }

    /// Medicare and private health fund details.
    #[must_use]
    pub fn medical_aid(&self) -> &MedicalAidDetails {
        &self.medical_aid
    }

    /// Version this patient will have once its pending events are committed.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn next_version(&self) -> i64 {
        self.version + self.events.len() as i64
    }

    fn raise(
        &mut self,
        event_type: &str,
        kind: PatientEventKind,
        ctx: &CorrelationContext,
        clock: &dyn Clock,
    ) {
        let sequence_number = self.next_version() + 1;
        let event = PatientEvent {
            metadata: EventMetadata::new(event_type, self.id, sequence_number, ctx, clock),
            kind,
        };
        self.events.append(event);
    }
}

impl AggregateRoot for Patient {
    type Event = PatientEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn aggregate_type(&self) -> &'static str {
        "patient"
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn events(&self) -> &EventBuffer<Self::Event> {
        &self.events
    }

    fn events_mut(&mut self) -> &mut EventBuffer<Self::Event> {
        &mut self.events
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

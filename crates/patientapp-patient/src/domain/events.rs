//! Domain events for the Patient context.

use patientapp_core::error::DomainError;
use patientapp_core::event::{DomainEvent, EventMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event kind emitted when a patient registers.
pub const PATIENT_REGISTERED: &str = "patient.registered";
/// Event kind emitted when Medicare card details are recorded.
pub const MEDICARE_DETAILS_ADDED: &str = "patient.medicare_details_added";
/// Event kind emitted when a private health fund account is added.
pub const PRIVATE_HEALTH_FUND_ACCOUNT_ADDED: &str = "patient.private_health_fund_account_added";

/// Emitted when a new patient is registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRegistered {
    /// The patient identifier.
    pub patient_id: Uuid,
    /// The email the patient registered with.
    pub email: String,
}

/// Emitted when Medicare card details are recorded for a patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicareDetailsAdded {
    /// The patient identifier.
    pub patient_id: Uuid,
    /// Medicare card number.
    pub medicare_card_number: String,
    /// Position of the patient on the card.
    pub medicare_card_reference_number: i32,
}

/// Emitted when a private health fund account is added to a patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateHealthFundAccountAdded {
    /// The patient identifier.
    pub patient_id: Uuid,
    /// Name of the fund provider.
    pub provider_name: String,
    /// Account number with the provider.
    pub account_number: String,
}

/// Event payload variants for the Patient context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatientEventKind {
    /// A patient has been registered.
    PatientRegistered(PatientRegistered),
    /// Medicare details have been recorded.
    MedicareDetailsAdded(MedicareDetailsAdded),
    /// A private health fund account has been added.
    PrivateHealthFundAccountAdded(PrivateHealthFundAccountAdded),
}

/// Domain event envelope for the Patient context.
#[derive(Debug, Clone)]
pub struct PatientEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: PatientEventKind,
}

impl DomainEvent for PatientEvent {
    fn event_type(&self) -> &'static str {
        match &self.kind {
            PatientEventKind::PatientRegistered(_) => PATIENT_REGISTERED,
            PatientEventKind::MedicareDetailsAdded(_) => MEDICARE_DETAILS_ADDED,
            PatientEventKind::PrivateHealthFundAccountAdded(_) => {
                PRIVATE_HEALTH_FUND_ACCOUNT_ADDED
            }
        }
    }

    fn to_payload(&self) -> Result<serde_json::Value, DomainError> {
        let payload = match &self.kind {
            PatientEventKind::PatientRegistered(e) => serde_json::to_value(e)?,
            PatientEventKind::MedicareDetailsAdded(e) => serde_json::to_value(e)?,
            PatientEventKind::PrivateHealthFundAccountAdded(e) => serde_json::to_value(e)?,
        };
        Ok(payload)
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}

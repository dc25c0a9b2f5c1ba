//! Commands for the Patient context.

use chrono::NaiveDate;
use patientapp_core::command::Command;
use patientapp_core::context::CorrelationContext;
use uuid::Uuid;

use super::aggregates::Registration;

/// Command to register a new patient.
#[derive(Debug, Clone)]
pub struct RegisterPatient {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Identifier to assign to the new patient.
    pub patient_id: Uuid,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Date of birth.
    pub date_of_birth: NaiveDate,
    /// Contact email.
    pub email: String,
    /// Medicare card number.
    pub medicare_number: String,
    /// Position of the patient on the Medicare card.
    pub medicare_reference: i32,
}

impl RegisterPatient {
    pub(crate) fn registration(&self) -> Registration {
        Registration {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            date_of_birth: self.date_of_birth,
            medicare_card_number: self.medicare_number.clone(),
            medicare_card_reference_number: self.medicare_reference,
        }
    }
}

impl Command for RegisterPatient {
    fn command_type(&self) -> &'static str {
        "patient.register_patient"
    }

    fn context(&self) -> CorrelationContext {
        CorrelationContext::new(self.correlation_id)
    }
}

/// Command to record Medicare card details for an existing patient.
#[derive(Debug, Clone)]
pub struct AddMedicareDetails {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The patient identifier.
    pub patient_id: Uuid,
    /// Medicare card number.
    pub medicare_number: String,
    /// Position of the patient on the Medicare card.
    pub medicare_reference: i32,
}

impl Command for AddMedicareDetails {
    fn command_type(&self) -> &'static str {
        "patient.add_medicare_details"
    }

    fn context(&self) -> CorrelationContext {
        CorrelationContext::new(self.correlation_id)
    }
}

/// Command to add a private health fund account to a patient.
#[derive(Debug, Clone)]
pub struct AddPrivateHealthFundAccount {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The patient identifier.
    pub patient_id: Uuid,
    /// Name of the fund provider.
    pub provider_name: String,
    /// Account number with the provider.
    pub account_number: String,
}

impl Command for AddPrivateHealthFundAccount {
    fn command_type(&self) -> &'static str {
        "patient.add_private_health_fund_account"
    }

    fn context(&self) -> CorrelationContext {
        CorrelationContext::new(self.correlation_id)
    }
}

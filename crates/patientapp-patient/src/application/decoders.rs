//! Outbox decoders for every event kind the Patient context emits.

use patientapp_core::error::DomainError;
use patientapp_core::event::DomainEvent;
use patientapp_core::outbox::OutboxRecord;
use patientapp_core::registry::DecoderRegistry;

use crate::domain::events::{
    MEDICARE_DETAILS_ADDED, PATIENT_REGISTERED, PRIVATE_HEALTH_FUND_ACCOUNT_ADDED, PatientEvent,
    PatientEventKind,
};

/// Registers the decoders of the Patient context.
///
/// # Errors
///
/// Returns `DomainError::Validation` if one of the kinds is already
/// registered.
pub fn register_decoders(registry: &mut DecoderRegistry) -> Result<(), DomainError> {
    registry.register(PATIENT_REGISTERED, decode_patient_registered)?;
    registry.register(MEDICARE_DETAILS_ADDED, decode_medicare_details_added)?;
    registry.register(
        PRIVATE_HEALTH_FUND_ACCOUNT_ADDED,
        decode_private_health_fund_account_added,
    )?;
    Ok(())
}

fn envelope(record: &OutboxRecord, kind: PatientEventKind) -> Box<dyn DomainEvent> {
    Box::new(PatientEvent {
        metadata: record.event_metadata(),
        kind,
    })
}

fn decode_patient_registered(record: &OutboxRecord) -> Result<Box<dyn DomainEvent>, DomainError> {
    let payload = serde_json::from_value(record.payload.clone())?;
    Ok(envelope(record, PatientEventKind::PatientRegistered(payload)))
}

fn decode_medicare_details_added(
    record: &OutboxRecord,
) -> Result<Box<dyn DomainEvent>, DomainError> {
    let payload = serde_json::from_value(record.payload.clone())?;
    Ok(envelope(record, PatientEventKind::MedicareDetailsAdded(payload)))
}

fn decode_private_health_fund_account_added(
    record: &OutboxRecord,
) -> Result<Box<dyn DomainEvent>, DomainError> {
    let payload = serde_json::from_value(record.payload.clone())?;
    Ok(envelope(
        record,
        PatientEventKind::PrivateHealthFundAccountAdded(payload),
    ))
}

//! Command handlers for the Patient context.
//!
//! Each handler loads or creates the aggregate, executes the domain method,
//! stages the new state through the repository, and commits it together
//! with the raised events' outbox records in one unit of work.

use patientapp_core::clock::Clock;
use patientapp_core::command::Command;
use patientapp_core::error::DomainError;
use patientapp_core::unit_of_work::{TransactionManager, UnitOfWork};
use tracing::{info, warn};

use crate::application::query_handlers::PatientProfile;
use crate::domain::aggregates::Patient;
use crate::domain::commands::{AddMedicareDetails, AddPrivateHealthFundAccount, RegisterPatient};
use crate::domain::repository::PatientRepository;

async fn rollback_quietly(uow: UnitOfWork) {
    if let Err(e) = uow.rollback().await {
        warn!(error = %e, "rollback failed");
    }
}

/// Commits `patient` and its buffered events once its state write was
/// staged, and returns the committed profile.
async fn commit_patient(
    uow: UnitOfWork,
    patient: &mut Patient,
    staged: Result<(), DomainError>,
    clock: &dyn Clock,
) -> Result<PatientProfile, DomainError> {
    if let Err(e) = staged {
        rollback_quietly(uow).await;
        return Err(e);
    }
    let committed_version = patient.next_version();
    let correlation_id = uow.context().correlation_id;
    let written = uow.commit(&mut [&mut *patient]).await?;
    patient.version = committed_version;

    info!(
        %correlation_id,
        patient_id = %patient.id,
        version = committed_version,
        outbox_records = written,
        "patient committed"
    );
    Ok(PatientProfile::of(patient, clock.today()))
}

/// Handles the `RegisterPatient` command.
///
/// # Errors
///
/// Returns `DomainError::Conflict` if a patient with the email already
/// exists, `DomainError::Validation` if the input is invalid, or the
/// storage error that aborted the unit of work.
pub async fn handle_register_patient(
    command: &RegisterPatient,
    clock: &dyn Clock,
    repo: &dyn PatientRepository,
    transactions: &dyn TransactionManager,
) -> Result<PatientProfile, DomainError> {
    let ctx = command.context();
    info!(
        command = command.command_type(),
        correlation_id = %ctx.correlation_id,
        "handling command"
    );

    if repo.find_by_email(&command.email).await?.is_some() {
        return Err(DomainError::Conflict(format!(
            "a patient with email {} already exists",
            command.email.trim()
        )));
    }

    let mut patient = Patient::register(command.patient_id, &command.registration(), &ctx, clock)?;

    let mut uow = UnitOfWork::begin(transactions, ctx).await?;
    let staged = repo.insert(uow.transaction(), &patient).await;
    commit_patient(uow, &mut patient, staged, clock).await
}

/// Handles the `AddMedicareDetails` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the patient does not exist,
/// `DomainError::Validation` if the details are invalid,
/// `DomainError::ConcurrencyConflict` if the patient changed concurrently,
/// or the storage error that aborted the unit of work.
pub async fn handle_add_medicare_details(
    command: &AddMedicareDetails,
    clock: &dyn Clock,
    repo: &dyn PatientRepository,
    transactions: &dyn TransactionManager,
) -> Result<PatientProfile, DomainError> {
    let ctx = command.context();
    info!(
        command = command.command_type(),
        correlation_id = %ctx.correlation_id,
        "handling command"
    );

    let mut patient = repo
        .find_by_id(command.patient_id)
        .await?
        .ok_or(DomainError::AggregateNotFound(command.patient_id))?;
    patient.add_medicare_details(
        &command.medicare_number,
        command.medicare_reference,
        &ctx,
        clock,
    )?;

    let mut uow = UnitOfWork::begin(transactions, ctx).await?;
    let staged = repo.update(uow.transaction(), &patient).await;
    commit_patient(uow, &mut patient, staged, clock).await
}

/// Handles the `AddPrivateHealthFundAccount` command.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the patient does not exist,
/// `DomainError::Conflict` if the account is already recorded,
/// `DomainError::ConcurrencyConflict` if the patient changed concurrently,
/// or the storage error that aborted the unit of work.
pub async fn handle_add_private_health_fund_account(
    command: &AddPrivateHealthFundAccount,
    clock: &dyn Clock,
    repo: &dyn PatientRepository,
    transactions: &dyn TransactionManager,
) -> Result<PatientProfile, DomainError> {
    let ctx = command.context();
    info!(
        command = command.command_type(),
        correlation_id = %ctx.correlation_id,
        "handling command"
    );

    let mut patient = repo
        .find_by_id(command.patient_id)
        .await?
        .ok_or(DomainError::AggregateNotFound(command.patient_id))?;
    patient.add_private_health_fund_account(
        &command.provider_name,
        &command.account_number,
        &ctx,
        clock,
    )?;

    let mut uow = UnitOfWork::begin(transactions, ctx).await?;
    let staged = repo.update(uow.transaction(), &patient).await;
    commit_patient(uow, &mut patient, staged, clock).await
}

//! Storage adapters for the Patient context.

pub mod pg_patient_repository;

//! Domain model for the Patient context.

pub mod aggregates;
pub mod commands;
pub mod events;
pub mod repository;
pub mod value_objects;

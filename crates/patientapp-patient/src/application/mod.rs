//! Use cases for the Patient context.

pub mod command_handlers;
pub mod decoders;
pub mod query_handlers;

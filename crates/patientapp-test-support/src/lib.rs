//! Shared test doubles for the patient services outbox pipeline.

mod clock;
mod outbox;
mod publisher;

pub use clock::{FixedClock, SteppingClock};
pub use outbox::{InMemoryOutbox, InMemoryTransaction, StagedRow};
pub use publisher::{
    FailingPublisher, FlakyPublisher, PublishedMessage, RecordingPublisher, StalledPublisher,
};

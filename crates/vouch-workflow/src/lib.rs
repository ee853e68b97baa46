//! The verification orchestrator.
//!
//! [`Orchestrator`] drives one verification run through its phases:
//! applicant creation, capture-token issuance, check creation, polling and
//! reconciliation of the verdict into the identity directory. It is generic
//! over the three collaborators defined in `vouch-core`, so the same state
//! machine runs against the real HTTP clients, SQLite, or test fakes.

mod guard;
mod memory;
mod orchestrator;
mod timer;

pub use memory::MemorySessionStore;
pub use orchestrator::{
  ApplicantStarted, CheckStarted, DEFAULT_POLL_INTERVAL, Orchestrator, PollOutcome,
  WorkflowConfig,
};
pub use timer::{FixedInterval, ManualTimer, PollTimer, TickHandle};

#[cfg(test)]
mod fakes;

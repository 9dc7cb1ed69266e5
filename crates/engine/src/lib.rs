//! Migration and rollback orchestration.
//!
//! [`orchestrator::Orchestrator`] drives one run at a time against any
//! storage that implements the [`store::ExclusionLock`] and
//! [`store::VersionLedger`] seams. The PostgreSQL implementation lives in
//! `schemashift_db`.

pub mod error;
pub mod orchestrator;
pub mod outcome;
pub mod store;

#[cfg(test)]
mod memory;

pub use error::RunError;
pub use orchestrator::Orchestrator;
pub use outcome::{RunOutcome, StatusReport};
pub use store::{ExclusionLock, LockAttempt, VersionLedger};

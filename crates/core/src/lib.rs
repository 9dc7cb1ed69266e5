//! Database-free domain of the schemashift migration runner.
//!
//! Holds the version type and its ordering, the change-script model and
//! filename convention, the filesystem [`repository::ScriptRepository`], and
//! the execution report contract with its sinks. Everything that talks to a
//! database lives in `schemashift_db`; the run state machine lives in
//! `schemashift_engine`.

pub mod error;
pub mod naming;
pub mod report;
pub mod repository;
pub mod script;
pub mod types;

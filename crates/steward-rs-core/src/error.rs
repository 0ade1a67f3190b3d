//! Error types for the core orchestration crate.

use crate::journal::JournalError;
use steward_rs_protocol::JobId;
use thiserror::Error;

/// Errors returned by orchestrator operations.
#[derive(Debug, Error)]
pub enum StewardCoreError {
    /// Job handle is unknown to the orchestrator.
    #[error("unknown job: {0}")]
    UnknownJob(JobId),
    /// An activity exhausted its retry budget or failed terminally.
    #[error("activity `{name}` failed after {attempts} attempt(s): {message}")]
    Activity {
        name: &'static str,
        attempts: u32,
        message: String,
    },
    /// Journal persistence failed.
    #[error("journal error: {0}")]
    Journal(#[from] JournalError),
    /// The live code path no longer matches the recorded history.
    #[error("replay diverged from journal: {0}")]
    ReplayDivergence(String),
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

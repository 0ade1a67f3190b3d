//! Core data types shared across the orchestrator API.

use serde::{Deserialize, Serialize};
use steward_rs_protocol::{JobId, JobStatus, OwnerId};

/// A tracked job: one goal, one owner, one durable execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    /// Durable-execution handle; the address for signals and resume.
    pub handle: JobId,
    /// Key of the job record held by the persistence collaborator.
    pub record_id: String,
    /// The owner's task, free text.
    pub goal: String,
    /// Owner identity.
    pub owner_id: OwnerId,
    /// Address that owner notifications are sent to.
    pub notify_address: String,
    /// Current lifecycle status.
    pub status: JobStatus,
}

/// Terminal result of one orchestrated job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskOutcome {
    /// Durable-execution handle of the job.
    pub job_id: JobId,
    /// Terminal status the job reached.
    pub status: JobStatus,
    /// Human-readable outcome summary.
    pub summary: String,
}

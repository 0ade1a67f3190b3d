//! Wire protocol types for Steward jobs, signals, and events.

mod collaborators;
mod turn;

pub use collaborators::{
    ActivityError, BrowserHost, JobStore, MemoryStore, Notifier, PlanDecision, Planner,
    SessionHandle, Strategy,
};
pub use turn::{TurnErrorKind, TurnResult};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a job; doubles as the durable-execution handle.
pub type JobId = Uuid;
/// Owner identity as issued by the identity collaborator.
pub type OwnerId = String;

/// Lifecycle status of a job record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job record created, orchestration not yet underway.
    Pending,
    /// Orchestrator is actively working the goal.
    Running,
    /// Suspended on a human approval decision.
    WaitingApproval,
    /// Suspended pending clarification from the owner.
    WaitingInfo,
    /// Goal reached (possibly with caveats).
    Completed,
    /// Terminated by an unrecoverable error or an expired approval wait.
    Failed,
    /// Owner rejected a high-risk action.
    Rejected,
    /// Owner pulled the kill switch.
    Killed,
}

impl JobStatus {
    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::WaitingApproval => "waiting_approval",
            JobStatus::WaitingInfo => "waiting_info",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Rejected => "rejected",
            JobStatus::Killed => "killed",
        }
    }

    /// Parse a status from a lowercase string; unknown values map to `Pending`.
    pub fn parse(value: &str) -> Self {
        match value {
            "running" => JobStatus::Running,
            "waiting_approval" => JobStatus::WaitingApproval,
            "waiting_info" => JobStatus::WaitingInfo,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            "rejected" => JobStatus::Rejected,
            "killed" => JobStatus::Killed,
            _ => JobStatus::Pending,
        }
    }

    /// Whether the status is terminal, with no further transitions legal.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Rejected | JobStatus::Killed
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Asynchronous, out-of-band control signal delivered to a running job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "type", content = "payload")]
pub enum Signal {
    /// Approve the pending high-risk action.
    Approve,
    /// Reject the pending high-risk action.
    Reject,
    /// Stop the job; one-way, observed at the next checkpoint.
    Kill,
    /// Inject an owner message into the working goal at the next turn boundary.
    UserMessage(String),
}

/// Resolution written into the single decision slot by `approve`/`reject`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Owner approved the action.
    Approved,
    /// Owner rejected the action.
    Rejected,
}

/// Outcome of one approval gate wait.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GateOutcome {
    /// Decision slot resolved to approved; the loop resumes.
    Approved,
    /// Decision slot resolved to rejected; the job terminates.
    Rejected,
    /// Kill flag observed while waiting.
    Killed,
    /// The bounded wait elapsed with no decision.
    DeadlineElapsed,
}

/// Read-only view of a job's control state, returned by the status query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusSnapshot {
    /// Current decision slot value, if any.
    pub decision: Option<Decision>,
    /// Number of owner messages queued for the next turn boundary.
    pub pending_messages: usize,
    /// Whether the kill flag has been raised.
    pub killed: bool,
}

/// Wrapper for events emitted during orchestration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMsg {
    /// Unique id for the event.
    pub id: Uuid,
    /// Job the event belongs to.
    pub job_id: JobId,
    /// Timestamp when the event was created.
    pub created_at: DateTime<Utc>,
    /// Event payload content.
    pub payload: EventPayload,
}

/// All events emitted during orchestration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "payload")]
pub enum EventPayload {
    /// Orchestration started for a goal.
    JobStarted { goal: String },
    /// Strategy planning resolved to a classification.
    StrategyDecided { classification: String },
    /// A browser turn is being dispatched.
    TurnStarted { turn: u32 },
    /// A browser turn returned.
    TurnCompleted { turn: u32, finished: bool },
    /// Queued owner messages were merged into the working goal.
    MessagesMerged { count: usize },
    /// A high-risk action is waiting on the owner.
    ApprovalRequested { action: String },
    /// The approval gate resolved.
    ApprovalResolved { outcome: GateOutcome },
    /// The job reached a terminal status.
    JobTerminated { status: JobStatus, summary: String },
}

/// Sink interface for orchestration events.
pub trait EventSink: Send + Sync {
    /// Emit an event to downstream listeners.
    fn emit(&self, event: EventMsg);
}

//! Collaborator boundaries for all external side-effecting work.
//!
//! The orchestration core never talks to a database, browser backend, model,
//! or mail service directly; each concern sits behind one of these traits
//! and is invoked through the core's activity invoker. Collaborators are
//! expected to keep their own effects idempotent under retry: a retried
//! call that partially succeeded upstream must not double-apply anything
//! beyond what the collaborator itself guarantees safe to repeat.

use crate::{JobId, JobStatus, OwnerId, TurnResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Failure of a single collaborator call, classified for retry handling.
#[derive(Debug, Error)]
pub enum ActivityError {
    /// Infrastructure-level failure (network, upstream 5xx) worth retrying.
    #[error("transient failure: {0}")]
    Transient(String),
    /// Failure that retrying cannot fix; propagates to the orchestrator.
    #[error("terminal failure: {0}")]
    Terminal(String),
}

impl ActivityError {
    /// Build a transient error from any displayable cause.
    pub fn transient(message: impl std::fmt::Display) -> Self {
        ActivityError::Transient(message.to_string())
    }

    /// Build a terminal error from any displayable cause.
    pub fn terminal(message: impl std::fmt::Display) -> Self {
        ActivityError::Terminal(message.to_string())
    }

    /// Whether the invoker should retry this failure.
    pub fn is_transient(&self) -> bool {
        matches!(self, ActivityError::Transient(_))
    }
}

/// Strategy selected during planning.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// The goal needs a remote browser session.
    Browser,
    /// The goal resolves from long-term memory alone.
    Memory,
    /// The owner must supply more information first.
    Clarify,
}

impl Strategy {
    /// Return the strategy as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Browser => "browser",
            Strategy::Memory => "memory",
            Strategy::Clarify => "clarify",
        }
    }

    /// Parse a planner classification; anything unrecognized falls back to
    /// `Memory` so a misbehaving planner can never crash the orchestrator.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "browser" => Strategy::Browser,
            "clarify" => Strategy::Clarify,
            _ => Strategy::Memory,
        }
    }
}

/// Outcome of the strategy-planning activity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanDecision {
    /// Raw classification string as returned by the planner.
    pub classification: String,
    /// Planner reasoning; used as the summary on non-browser paths.
    pub reasoning: String,
    /// Owner profile context threaded into every turn.
    #[serde(default)]
    pub profile_context: Value,
}

impl PlanDecision {
    /// The parsed strategy, with the `Memory` fallback applied.
    pub fn strategy(&self) -> Strategy {
        Strategy::parse(&self.classification)
    }
}

/// Opaque handle to one provisioned remote browser session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionHandle(pub String);

impl SessionHandle {
    /// View the raw session id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persistence collaborator owning the job record table.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Create the job record and return its persistence key.
    async fn create_job(
        &self,
        owner_id: &OwnerId,
        goal: &str,
        handle: JobId,
    ) -> Result<String, ActivityError>;

    /// Update the high-level status of a job record.
    async fn update_status(&self, record_id: &str, status: JobStatus)
    -> Result<(), ActivityError>;
}

/// Reasoning collaborator that decides the strategy for a goal.
#[async_trait]
pub trait Planner: Send + Sync {
    /// Consult long-term context and classify the goal.
    async fn plan_strategy(
        &self,
        owner_id: &OwnerId,
        goal: &str,
    ) -> Result<PlanDecision, ActivityError>;
}

/// Browser-automation collaborator owning remote sessions and turns.
///
/// `execute_turn` must surface rate-limit and quota exhaustion as a terminal
/// `TurnResult` (`finished = true`, `error_kind` set) rather than an error,
/// so the orchestrator can complete the job gracefully instead of retrying
/// against a backend that is rejecting every call.
#[async_trait]
pub trait BrowserHost: Send + Sync {
    /// Provision one remote browser session for a job.
    async fn provision_session(
        &self,
        owner_id: &OwnerId,
        record_id: &str,
    ) -> Result<SessionHandle, ActivityError>;

    /// Execute one observe-decide-act cycle against the session.
    async fn execute_turn(
        &self,
        session: &SessionHandle,
        goal: &str,
        owner_id: &OwnerId,
        profile_context: &Value,
        record_id: &str,
    ) -> Result<TurnResult, ActivityError>;

    /// Release a session; best-effort, the caller swallows failures.
    async fn release_session(&self, session: &SessionHandle) -> Result<(), ActivityError>;
}

/// Notification collaborator for all outbound owner communication.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Confirm to the owner that work on the goal has started.
    async fn send_task_started(
        &self,
        notify_address: &str,
        owner_id: &OwnerId,
        goal: &str,
    ) -> Result<(), ActivityError>;

    /// Ask the owner to approve a high-risk action; returns whether the
    /// request reached the owner.
    async fn send_approval_request(
        &self,
        notify_address: &str,
        owner_id: &OwnerId,
        handle: JobId,
        action: &str,
    ) -> Result<bool, ActivityError>;

    /// Ask the owner for more information before work can proceed.
    async fn send_clarification_request(
        &self,
        notify_address: &str,
        owner_id: &OwnerId,
        goal: &str,
        question: &str,
    ) -> Result<(), ActivityError>;

    /// Report a completed goal with its summary.
    async fn send_completion(
        &self,
        notify_address: &str,
        owner_id: &OwnerId,
        goal: &str,
        summary: &str,
    ) -> Result<(), ActivityError>;

    /// Report a job that ended without completing: failed, rejected, killed.
    async fn send_termination(
        &self,
        notify_address: &str,
        owner_id: &OwnerId,
        goal: &str,
        status: JobStatus,
        detail: &str,
    ) -> Result<(), ActivityError>;
}

/// Long-term memory collaborator.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Persist the outcome of a job for future context.
    async fn save_outcome(
        &self,
        owner_id: &OwnerId,
        goal: &str,
        outcome: &str,
    ) -> Result<(), ActivityError>;
}

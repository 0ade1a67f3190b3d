use serde::{Deserialize, Serialize};

/// Result of one observe-decide-act cycle executed by the turn collaborator.
///
/// Consumed immediately by the orchestrator to derive the next transition and
/// never retained beyond that.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TurnResult {
    /// Reasoning text produced for this turn.
    pub reasoning: String,
    /// Whether the collaborator considers the goal reached.
    pub finished: bool,
    /// Short summary of the action taken, if any.
    #[serde(default)]
    pub action_taken: Option<String>,
    /// Explicit request for human approval before the described action runs.
    #[serde(default)]
    pub requires_approval: bool,
    /// Human-readable description of the action awaiting approval.
    #[serde(default)]
    pub approval_action: Option<String>,
    /// Set when the collaborator hit a resource-exhaustion condition and
    /// surfaced it as a terminal result instead of an error.
    #[serde(default)]
    pub error_kind: Option<TurnErrorKind>,
}

impl TurnResult {
    /// Build a plain reasoning-only result.
    pub fn reasoning(text: impl Into<String>) -> Self {
        Self {
            reasoning: text.into(),
            ..Self::default()
        }
    }

    /// Mark the result as finishing the goal.
    pub fn finished(mut self) -> Self {
        self.finished = true;
        self
    }

    /// The description the approval gate should show the owner.
    pub fn approval_description(&self) -> &str {
        match self.approval_action.as_deref() {
            Some(action) if !action.is_empty() => action,
            _ => &self.reasoning,
        }
    }
}

/// Resource-exhaustion classification reported by the turn collaborator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TurnErrorKind {
    /// The upstream model or browser backend is rate limiting calls.
    RateLimit,
    /// A usage quota is exhausted until reset.
    QuotaExceeded,
}

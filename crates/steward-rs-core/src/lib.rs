//! Durable task-orchestration core for supervised long-running agents.
//!
//! The orchestrator sequences planning, bounded action turns, human-in-the-
//! loop approval gates, mid-task message injection, and a kill switch, while
//! journaling every nondeterministic observation so a job survives process
//! restarts and multi-day suspensions. All thinking and doing is delegated
//! to collaborators behind trait boundaries.

mod collaborators;
mod control;
mod error;
mod invoker;
mod journal;
mod orchestrator;
mod risk;
mod types;

pub use collaborators::{
    ActivityError, BrowserHost, Collaborators, JobStore, MemoryStore, Notifier, Planner,
};
pub use control::{ControlChannel, ControlRegistry};
pub use error::StewardCoreError;
pub use invoker::ActivityInvoker;
pub use journal::{JournalError, JournalEvent, JournalStore, JsonlJournalStore, resolve_journal_root};
pub use orchestrator::Orchestrator;
pub use risk::{KeywordRiskClassifier, NoRiskClassifier, RiskClassifier, RiskMatch};
pub use types::{Job, TaskOutcome};

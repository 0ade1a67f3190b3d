//! Test helpers shared across Steward crates.

pub mod browser;
pub mod memory;
pub mod notifier;
pub mod planner;
pub mod store;

pub use browser::{BrowserCalls, ScriptedBrowserHost};
pub use memory::RecordingMemory;
pub use notifier::{NotifierCall, RecordingNotifier};
pub use planner::{FailingPlanner, FixedPlanner};
pub use store::InMemoryJobStore;

use steward_rs_protocol::TurnResult;

/// Build an unfinished reasoning-only turn.
pub fn turn(reasoning: &str) -> TurnResult {
    TurnResult::reasoning(reasoning)
}

/// Build a finishing turn.
pub fn final_turn(reasoning: &str) -> TurnResult {
    TurnResult::reasoning(reasoning).finished()
}

/// Build a turn that explicitly requests approval for an action.
pub fn approval_turn(reasoning: &str, action: &str) -> TurnResult {
    TurnResult {
        reasoning: reasoning.to_string(),
        requires_approval: true,
        approval_action: Some(action.to_string()),
        ..TurnResult::default()
    }
}

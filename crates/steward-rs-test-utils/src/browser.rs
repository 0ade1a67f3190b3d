use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use steward_rs_protocol::{ActivityError, BrowserHost, OwnerId, SessionHandle, TurnResult};

/// Counters and captures recorded by `ScriptedBrowserHost`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowserCalls {
    pub provisioned: u32,
    pub released: u32,
    pub turns: u32,
    /// The goal text seen by each turn, in order.
    pub goals_seen: Vec<String>,
}

struct ScriptState {
    turns: VecDeque<TurnResult>,
    last: Option<TurnResult>,
    calls: BrowserCalls,
}

/// Browser host double that replays a scripted sequence of turns.
///
/// When the script runs dry the last turn repeats, which keeps ceiling tests
/// from needing twenty hand-written entries.
#[derive(Clone)]
pub struct ScriptedBrowserHost {
    state: Arc<Mutex<ScriptState>>,
    fail_provision: bool,
}

impl ScriptedBrowserHost {
    pub fn new(turns: Vec<TurnResult>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ScriptState {
                turns: turns.into(),
                last: None,
                calls: BrowserCalls::default(),
            })),
            fail_provision: false,
        }
    }

    /// Make `provision_session` fail terminally.
    pub fn failing_provision() -> Self {
        let mut host = Self::new(Vec::new());
        host.fail_provision = true;
        host
    }

    /// Snapshot of the recorded calls.
    pub fn calls(&self) -> BrowserCalls {
        self.state.lock().calls.clone()
    }
}

#[async_trait]
impl BrowserHost for ScriptedBrowserHost {
    async fn provision_session(
        &self,
        _owner_id: &OwnerId,
        record_id: &str,
    ) -> Result<SessionHandle, ActivityError> {
        if self.fail_provision {
            return Err(ActivityError::terminal("no session capacity"));
        }
        let mut state = self.state.lock();
        state.calls.provisioned += 1;
        Ok(SessionHandle(format!("session-{record_id}")))
    }

    async fn execute_turn(
        &self,
        _session: &SessionHandle,
        goal: &str,
        _owner_id: &OwnerId,
        _profile_context: &Value,
        _record_id: &str,
    ) -> Result<TurnResult, ActivityError> {
        let mut state = self.state.lock();
        state.calls.turns += 1;
        state.calls.goals_seen.push(goal.to_string());
        let next = match state.turns.pop_front() {
            Some(turn) => {
                state.last = Some(turn.clone());
                turn
            }
            None => state
                .last
                .clone()
                .ok_or_else(|| ActivityError::terminal("no scripted turns"))?,
        };
        Ok(next)
    }

    async fn release_session(&self, _session: &SessionHandle) -> Result<(), ActivityError> {
        self.state.lock().calls.released += 1;
        Ok(())
    }
}

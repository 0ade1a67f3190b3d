//! Record/replay execution context for one job.
//!
//! Live mode appends every nondeterministic observation to the journal at
//! the moment it affects control flow; replay mode feeds the same code path
//! from the recorded prefix instead, so a resumed job takes exactly the
//! branches it took before the restart and never re-invokes a completed
//! activity. Once the recorded prefix is exhausted the execution switches to
//! live seamlessly.

use crate::collaborators::ActivityError;
use crate::control::ControlChannel;
use crate::error::StewardCoreError;
use crate::invoker::ActivityInvoker;
use crate::journal::{JournalError, JournalEvent, JournalStore};
use chrono::{DateTime, Utc};
use log::warn;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use steward_rs_protocol::{GateOutcome, JobId};

/// Per-job execution context gluing the invoker to the journal.
pub(crate) struct Execution {
    job_id: JobId,
    store: Option<Arc<dyn JournalStore>>,
    replay: VecDeque<JournalEvent>,
    invoker: ActivityInvoker,
}

impl Execution {
    /// Fresh execution with nothing to replay.
    pub(crate) fn new(
        job_id: JobId,
        store: Option<Arc<dyn JournalStore>>,
        invoker: ActivityInvoker,
    ) -> Self {
        Self {
            job_id,
            store,
            replay: VecDeque::new(),
            invoker,
        }
    }

    /// Execution resuming from a recorded prefix.
    pub(crate) fn resuming(
        job_id: JobId,
        store: Arc<dyn JournalStore>,
        invoker: ActivityInvoker,
        recorded: Vec<JournalEvent>,
    ) -> Self {
        Self {
            job_id,
            store: Some(store),
            replay: recorded.into(),
            invoker,
        }
    }

    /// Whether recorded history remains to be consumed.
    pub(crate) fn replaying(&self) -> bool {
        !self.replay.is_empty()
    }

    /// Append an event to the journal (live mode only).
    pub(crate) fn record(&mut self, event: JournalEvent) -> Result<(), StewardCoreError> {
        debug_assert!(!self.replaying(), "recording while replay history remains");
        if let Some(store) = &self.store {
            store.append(self.job_id, &event)?;
        }
        Ok(())
    }

    fn divergence(&self, expected: &str, found: Option<&JournalEvent>) -> StewardCoreError {
        StewardCoreError::ReplayDivergence(format!(
            "expected {expected}, journal has {found:?} (job_id={})",
            self.job_id
        ))
    }

    /// Invoke an activity with timeout and retry, or replay its recorded
    /// result. A successful call is journaled before its value is returned.
    pub(crate) async fn activity<T, F, Fut>(
        &mut self,
        name: &'static str,
        call_timeout: Duration,
        op: F,
    ) -> Result<T, StewardCoreError>
    where
        T: Serialize + DeserializeOwned,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ActivityError>>,
    {
        if self.replaying() {
            return match self.replay.pop_front() {
                Some(JournalEvent::ActivityCompleted {
                    name: recorded,
                    result,
                }) if recorded == name => serde_json::from_value(result).map_err(|err| {
                    StewardCoreError::ReplayDivergence(format!(
                        "recorded result of `{name}` no longer decodes: {err}"
                    ))
                }),
                other => Err(self.divergence(&format!("activity `{name}`"), other.as_ref())),
            };
        }

        let value = self.invoker.invoke(name, call_timeout, op).await?;
        let result = serde_json::to_value(&value).map_err(JournalError::from)?;
        self.record(JournalEvent::ActivityCompleted {
            name: name.to_string(),
            result,
        })?;
        Ok(value)
    }

    /// Invoke a fire-and-confirm activity whose failure must not fail the
    /// job. The attempt outcome is journaled either way so replay stays
    /// aligned; returns whether the call succeeded.
    pub(crate) async fn activity_best_effort<F, Fut>(
        &mut self,
        name: &'static str,
        call_timeout: Duration,
        op: F,
    ) -> Result<bool, StewardCoreError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<(), ActivityError>>,
    {
        if self.replaying() {
            return match self.replay.pop_front() {
                Some(JournalEvent::ActivityCompleted {
                    name: recorded,
                    result,
                }) if recorded == name => Ok(result.as_bool().unwrap_or(false)),
                other => Err(self.divergence(&format!("activity `{name}`"), other.as_ref())),
            };
        }

        let delivered = match self.invoker.invoke(name, call_timeout, op).await {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    "best-effort activity failed (activity={}, job_id={}, error={})",
                    name, self.job_id, err
                );
                false
            }
        };
        self.record(JournalEvent::ActivityCompleted {
            name: name.to_string(),
            result: serde_json::Value::Bool(delivered),
        })?;
        Ok(delivered)
    }

    /// Kill check: true once the kill flag has been observed at a
    /// consumption point. Observation is journaled the first time so replay
    /// takes the same branch at the same point.
    pub(crate) fn observe_kill(
        &mut self,
        control: &ControlChannel,
    ) -> Result<bool, StewardCoreError> {
        if self.replaying() {
            if matches!(self.replay.front(), Some(JournalEvent::KillObserved)) {
                self.replay.pop_front();
                return Ok(true);
            }
            return Ok(false);
        }
        if control.killed() {
            self.record(JournalEvent::KillObserved)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Drain queued owner messages at a turn boundary. A non-empty drain is
    /// journaled; an empty queue records nothing.
    pub(crate) fn drain_messages(
        &mut self,
        control: &ControlChannel,
    ) -> Result<Vec<String>, StewardCoreError> {
        if self.replaying() {
            if matches!(self.replay.front(), Some(JournalEvent::MessagesDrained { .. })) {
                if let Some(JournalEvent::MessagesDrained { messages }) = self.replay.pop_front() {
                    return Ok(messages);
                }
            }
            return Ok(Vec::new());
        }
        let drained = control.drain_messages();
        if !drained.is_empty() {
            self.record(JournalEvent::MessagesDrained {
                messages: drained.clone(),
            })?;
        }
        Ok(drained)
    }

    /// Open an approval gate, returning the (possibly recorded) open time
    /// the deadline is measured from.
    pub(crate) fn open_gate(&mut self, action: &str) -> Result<DateTime<Utc>, StewardCoreError> {
        if self.replaying() {
            return match self.replay.pop_front() {
                Some(JournalEvent::GateOpened { opened_at, .. }) => Ok(opened_at),
                other => Err(self.divergence("gate open", other.as_ref())),
            };
        }
        let opened_at = Utc::now();
        self.record(JournalEvent::GateOpened {
            action: action.to_string(),
            opened_at,
        })?;
        Ok(opened_at)
    }

    /// Recorded outcome of the current gate wait, if the wait resolved
    /// before the restart. `None` means the wait must happen live.
    pub(crate) fn replay_gate_outcome(&mut self) -> Result<Option<GateOutcome>, StewardCoreError> {
        if !self.replaying() {
            return Ok(None);
        }
        match self.replay.pop_front() {
            Some(JournalEvent::GateResolved { outcome }) => Ok(Some(outcome)),
            other => Err(self.divergence("gate resolution", other.as_ref())),
        }
    }

    /// Journal a live gate resolution.
    pub(crate) fn record_gate_outcome(
        &mut self,
        outcome: GateOutcome,
    ) -> Result<(), StewardCoreError> {
        self.record(JournalEvent::GateResolved { outcome })
    }
}

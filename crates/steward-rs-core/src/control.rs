//! Control channel: out-of-band signals and the status query.
//!
//! All signal state for one job lives in a single watch cell mutated only
//! through the typed entry points below. Senders never block; the
//! orchestrator observes state at its own consumption points via a
//! subscribed receiver, which is what makes concurrent approve/reject/kill/
//! message delivery race-free.

use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use steward_rs_protocol::{Decision, JobId, Signal, StatusSnapshot};
use tokio::sync::watch;

/// Mutable signal state for one job.
#[derive(Debug, Clone, Default)]
pub(crate) struct ControlState {
    /// Single decision slot; approve/reject overwrite, last write wins.
    pub decision: Option<Decision>,
    /// One-way kill flag; never reset once raised.
    pub killed: bool,
    /// Owner messages queued until the next turn boundary, arrival order.
    pub pending: Vec<String>,
}

/// Signal entry points and status query for one job.
#[derive(Clone)]
pub struct ControlChannel {
    tx: Arc<watch::Sender<ControlState>>,
}

impl Default for ControlChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlChannel {
    /// Create a fresh channel with empty signal state.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ControlState::default());
        Self { tx: Arc::new(tx) }
    }

    /// Deliver a signal; safe at any point in the job's lifetime.
    pub fn signal(&self, signal: Signal) {
        match signal {
            Signal::Approve => self.approve(),
            Signal::Reject => self.reject(),
            Signal::Kill => self.kill(),
            Signal::UserMessage(text) => self.user_message(text),
        }
    }

    /// Write `Approved` into the decision slot.
    pub fn approve(&self) {
        self.tx.send_modify(|state| {
            state.decision = Some(Decision::Approved);
        });
    }

    /// Write `Rejected` into the decision slot.
    pub fn reject(&self) {
        self.tx.send_modify(|state| {
            state.decision = Some(Decision::Rejected);
        });
    }

    /// Raise the kill flag. Monotonic: once true, stays true.
    pub fn kill(&self) {
        self.tx.send_modify(|state| {
            state.killed = true;
        });
    }

    /// Queue an owner message for the next turn boundary.
    pub fn user_message(&self, text: String) {
        self.tx.send_modify(|state| {
            state.pending.push(text);
        });
    }

    /// Read-only snapshot of the current signal state.
    pub fn status(&self) -> StatusSnapshot {
        let state = self.tx.borrow();
        StatusSnapshot {
            decision: state.decision,
            pending_messages: state.pending.len(),
            killed: state.killed,
        }
    }

    /// Whether the kill flag is currently raised.
    pub(crate) fn killed(&self) -> bool {
        self.tx.borrow().killed
    }

    /// Take all queued messages, leaving the queue empty.
    pub(crate) fn drain_messages(&self) -> Vec<String> {
        let mut drained = Vec::new();
        self.tx.send_modify(|state| {
            drained = std::mem::take(&mut state.pending);
        });
        drained
    }

    /// Clear the decision slot so a stale decision cannot leak into a later
    /// approval request.
    pub(crate) fn clear_decision(&self) {
        self.tx.send_modify(|state| {
            state.decision = None;
        });
    }

    /// Subscribe for conditional waits on the signal state.
    pub(crate) fn subscribe(&self) -> watch::Receiver<ControlState> {
        self.tx.subscribe()
    }
}

/// Routes signals and status queries to per-job control channels.
///
/// Entries outlive their jobs on purpose: a signal arriving after
/// termination lands in a channel nobody consumes: no error, no effect.
#[derive(Clone, Default)]
pub struct ControlRegistry {
    channels: Arc<RwLock<HashMap<JobId, ControlChannel>>>,
}

impl ControlRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the channel for a job, returning it for the orchestrator.
    pub(crate) fn register(&self, job_id: JobId) -> ControlChannel {
        let channel = ControlChannel::new();
        self.channels.write().insert(job_id, channel.clone());
        debug!("registered control channel (job_id={})", job_id);
        channel
    }

    /// Look up the channel for a job.
    pub fn get(&self, job_id: JobId) -> Option<ControlChannel> {
        self.channels.read().get(&job_id).cloned()
    }

    /// Deliver a signal to a job; returns whether the job was known.
    pub fn signal(&self, job_id: JobId, signal: Signal) -> bool {
        match self.get(job_id) {
            Some(channel) => {
                channel.signal(signal);
                true
            }
            None => {
                debug!("dropping signal for unknown job (job_id={})", job_id);
                false
            }
        }
    }

    /// Status query for a job.
    pub fn status(&self, job_id: JobId) -> Option<StatusSnapshot> {
        self.get(job_id).map(|channel| channel.status())
    }
}

//! Collaborator wiring for the orchestrator.
//!
//! The trait boundaries themselves live in `steward-rs-protocol`; this
//! module bundles one implementation of each for injection.

use std::sync::Arc;

pub use steward_rs_protocol::{
    ActivityError, BrowserHost, JobStore, MemoryStore, Notifier, Planner,
};

/// Bundle of collaborators injected into the orchestrator.
#[derive(Clone)]
pub struct Collaborators {
    /// Job record persistence.
    pub job_store: Arc<dyn JobStore>,
    /// Strategy planning.
    pub planner: Arc<dyn Planner>,
    /// Remote browser sessions and turns.
    pub browser: Arc<dyn BrowserHost>,
    /// Outbound owner notifications.
    pub notifier: Arc<dyn Notifier>,
    /// Long-term memory writes.
    pub memory: Arc<dyn MemoryStore>,
}

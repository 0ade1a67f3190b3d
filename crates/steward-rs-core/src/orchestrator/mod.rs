//! Orchestrator Core

mod execution;
mod gate;
mod turn_loop;
mod workflow;

use crate::collaborators::Collaborators;
use crate::control::ControlRegistry;
use crate::error::StewardCoreError;
use crate::invoker::ActivityInvoker;
use crate::journal::{JournalEvent, JournalStore, JsonlJournalStore, resolve_journal_root};
use crate::risk::{KeywordRiskClassifier, RiskClassifier};
use crate::types::{Job, TaskOutcome};
use chrono::Utc;
use execution::Execution;
use log::{debug, info};
use std::sync::Arc;
use steward_rs_config::StewardConfig;
use steward_rs_protocol::{EventSink, JobId, JobStatus, OwnerId, Signal, StatusSnapshot};
use uuid::Uuid;
use workflow::JobRun;

/// Main orchestration façade: runs jobs, routes signals, answers queries.
///
/// One logical single-threaded execution per job; many jobs may run
/// concurrently as independent `run` futures sharing this façade.
pub struct Orchestrator {
    config: Arc<StewardConfig>,
    deps: Collaborators,
    registry: ControlRegistry,
    journal: Option<Arc<dyn JournalStore>>,
    risk: Arc<dyn RiskClassifier>,
    event_sink: Option<Arc<dyn EventSink>>,
    invoker: ActivityInvoker,
}

impl Orchestrator {
    /// Construct a new orchestrator over the given collaborators.
    pub fn new(
        config: StewardConfig,
        collaborators: Collaborators,
    ) -> Result<Self, StewardCoreError> {
        info!("initializing orchestrator");
        debug!(
            "orchestrator config flags (max_turns={}, journal={})",
            config.orchestrator.max_turns, config.journal.enabled
        );
        let journal: Option<Arc<dyn JournalStore>> = if config.journal.enabled {
            let root = resolve_journal_root(config.journal.path.as_ref())?;
            Some(Arc::new(JsonlJournalStore::new(root)?))
        } else {
            None
        };
        let invoker = ActivityInvoker::new(&config.retry);
        Ok(Self {
            config: Arc::new(config),
            deps: collaborators,
            registry: ControlRegistry::new(),
            journal,
            risk: Arc::new(KeywordRiskClassifier::new()),
            event_sink: None,
            invoker,
        })
    }

    /// Replace the journal store (e.g. with an in-memory store for tests).
    pub fn with_journal_store(mut self, store: Arc<dyn JournalStore>) -> Self {
        self.journal = Some(store);
        self
    }

    /// Replace the destructive-intent classifier.
    pub fn with_risk_classifier(mut self, risk: Arc<dyn RiskClassifier>) -> Self {
        self.risk = risk;
        self
    }

    /// Attach a sink for orchestration events.
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    /// Return the shared configuration for this orchestrator.
    pub fn config(&self) -> &StewardConfig {
        &self.config
    }

    /// Run one job to a terminal status.
    pub async fn run(
        &self,
        goal: impl Into<String>,
        owner_id: impl Into<OwnerId>,
        notify_address: impl Into<String>,
    ) -> Result<TaskOutcome, StewardCoreError> {
        let handle: JobId = Uuid::new_v4();
        let goal = goal.into();
        let owner_id = owner_id.into();
        let notify_address = notify_address.into();
        info!(
            "accepting job (job_id={}, owner_id={}, goal_len={})",
            handle,
            owner_id,
            goal.len()
        );

        let mut exec = Execution::new(handle, self.journal.clone(), self.invoker.clone());
        exec.record(JournalEvent::JobStarted {
            job_id: handle,
            goal: goal.clone(),
            owner_id: owner_id.clone(),
            notify_address: notify_address.clone(),
            started_at: Utc::now(),
        })?;

        let control = self.registry.register(handle);
        let job = Job {
            handle,
            record_id: String::new(),
            goal,
            owner_id,
            notify_address,
            status: JobStatus::Pending,
        };
        JobRun::new(
            self.config.clone(),
            self.deps.clone(),
            control,
            exec,
            self.risk.clone(),
            self.event_sink.clone(),
            job,
        )
        .run()
        .await
    }

    /// Resume a journaled job after a process restart.
    ///
    /// Completed activities replay from the journal without re-invoking
    /// their collaborators; a job whose journal already ends in a terminal
    /// record returns that outcome with no side effects. Signals delivered
    /// while the process was down are not recovered; senders are expected
    /// to redeliver (at-least-once).
    pub async fn resume(&self, job_id: JobId) -> Result<TaskOutcome, StewardCoreError> {
        let store = self
            .journal
            .clone()
            .ok_or(StewardCoreError::UnknownJob(job_id))?;
        let mut events = store
            .load(job_id)?
            .ok_or(StewardCoreError::UnknownJob(job_id))?;

        if let Some(JournalEvent::JobFinished { status, summary }) = events.last() {
            info!(
                "resume of finished job returns recorded outcome (job_id={}, status={})",
                job_id, status
            );
            return Ok(TaskOutcome {
                job_id,
                status: *status,
                summary: summary.clone(),
            });
        }

        if events.is_empty() {
            return Err(StewardCoreError::ReplayDivergence(format!(
                "journal for job {job_id} is empty"
            )));
        }
        let started = events.remove(0);
        let JournalEvent::JobStarted {
            goal,
            owner_id,
            notify_address,
            ..
        } = started
        else {
            return Err(StewardCoreError::ReplayDivergence(format!(
                "journal for job {job_id} does not begin with its start record"
            )));
        };
        info!(
            "resuming job (job_id={}, recorded_events={})",
            job_id,
            events.len()
        );

        let exec = Execution::resuming(job_id, store, self.invoker.clone(), events);
        let control = self.registry.register(job_id);
        let job = Job {
            handle: job_id,
            record_id: String::new(),
            goal,
            owner_id,
            notify_address,
            status: JobStatus::Pending,
        };
        JobRun::new(
            self.config.clone(),
            self.deps.clone(),
            control,
            exec,
            self.risk.clone(),
            self.event_sink.clone(),
            job,
        )
        .run()
        .await
    }

    /// Deliver a signal to a job; unknown and terminated jobs absorb it
    /// silently.
    pub fn signal(&self, job_id: JobId, signal: Signal) -> bool {
        self.registry.signal(job_id, signal)
    }

    /// Approve the pending high-risk action for a job.
    pub fn approve(&self, job_id: JobId) -> bool {
        self.signal(job_id, Signal::Approve)
    }

    /// Reject the pending high-risk action for a job.
    pub fn reject(&self, job_id: JobId) -> bool {
        self.signal(job_id, Signal::Reject)
    }

    /// Raise the kill switch for a job.
    pub fn kill(&self, job_id: JobId) -> bool {
        self.signal(job_id, Signal::Kill)
    }

    /// Queue an owner message for a job's next turn boundary.
    pub fn post_message(&self, job_id: JobId, text: impl Into<String>) -> bool {
        self.signal(job_id, Signal::UserMessage(text.into()))
    }

    /// Read-only status query for a job.
    pub fn job_status(&self, job_id: JobId) -> Option<StatusSnapshot> {
        self.registry.status(job_id)
    }
}

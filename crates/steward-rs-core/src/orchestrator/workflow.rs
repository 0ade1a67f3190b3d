//! The durable job state machine.
//!
//! One `JobRun` drives a single job from `INIT` to a terminal status:
//! planning, the strategy branch, the bounded turn loop with its approval
//! gates, completion or failure reporting, and the guaranteed cleanup block.
//! All external work flows through the record/replay execution context, so
//! the same code path serves first runs and post-restart resumes.

use crate::collaborators::Collaborators;
use crate::control::ControlChannel;
use crate::error::StewardCoreError;
use crate::journal::JournalEvent;
use crate::orchestrator::execution::Execution;
use crate::risk::RiskClassifier;
use crate::types::{Job, TaskOutcome};
use chrono::Utc;
use log::{error, info, warn};
use std::sync::Arc;
use steward_rs_config::StewardConfig;
use steward_rs_protocol::{
    EventMsg, EventPayload, EventSink, JobStatus, PlanDecision, SessionHandle, Strategy,
};
use uuid::Uuid;

/// Delimiter between the original goal and merged owner messages.
pub(crate) const USER_UPDATE_DELIMITER: &str = "--- USER UPDATE ---";

/// One in-flight job execution.
pub(crate) struct JobRun {
    pub(super) config: Arc<StewardConfig>,
    pub(super) deps: Collaborators,
    pub(super) control: ControlChannel,
    pub(super) exec: Execution,
    pub(super) risk: Arc<dyn RiskClassifier>,
    pub(super) sink: Option<Arc<dyn EventSink>>,
    pub(super) job: Job,
    /// Every owner message merged so far; the working goal is rebuilt from
    /// the full list at each merge, so the addendum accumulates.
    pub(super) merged_messages: Vec<String>,
    /// The provisioned session, held for the guaranteed cleanup block.
    pub(super) session: Option<SessionHandle>,
}

impl JobRun {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        config: Arc<StewardConfig>,
        deps: Collaborators,
        control: ControlChannel,
        exec: Execution,
        risk: Arc<dyn RiskClassifier>,
        sink: Option<Arc<dyn EventSink>>,
        job: Job,
    ) -> Self {
        Self {
            config,
            deps,
            control,
            exec,
            risk,
            sink,
            job,
            merged_messages: Vec::new(),
            session: None,
        }
    }

    /// Emit an orchestration event if a sink is attached.
    pub(super) fn emit(&self, payload: EventPayload) {
        if let Some(sink) = &self.sink {
            sink.emit(EventMsg {
                id: Uuid::new_v4(),
                job_id: self.job.handle,
                created_at: Utc::now(),
                payload,
            });
        }
    }

    /// Drive the job to a terminal status.
    ///
    /// The cleanup block always runs, success or failure, and the terminal
    /// record is journaled last so a resume of a finished job is a pure read.
    pub(crate) async fn run(mut self) -> Result<TaskOutcome, StewardCoreError> {
        info!(
            "job started (job_id={}, owner_id={}, goal_len={})",
            self.job.handle,
            self.job.owner_id,
            self.job.goal.len()
        );
        self.emit(EventPayload::JobStarted {
            goal: self.job.goal.clone(),
        });

        let outcome = match self.execute().await {
            Ok(outcome) => Ok(outcome),
            Err(err) => self.fail(err).await,
        };
        // Cleanup runs before any error propagates so the session is always
        // released, even when the journal itself is unhealthy.
        let cleanup = self.cleanup().await;
        let outcome = outcome?;
        cleanup?;

        if self.exec.replaying() {
            return Err(StewardCoreError::ReplayDivergence(
                "journal continues past the end of the execution".to_string(),
            ));
        }
        self.exec.record(JournalEvent::JobFinished {
            status: outcome.status,
            summary: outcome.summary.clone(),
        })?;
        self.emit(EventPayload::JobTerminated {
            status: outcome.status,
            summary: outcome.summary.clone(),
        });
        info!(
            "job finished (job_id={}, status={})",
            self.job.handle, outcome.status
        );
        Ok(outcome)
    }

    /// INIT → PLANNING → strategy branch.
    async fn execute(&mut self) -> Result<TaskOutcome, StewardCoreError> {
        // INIT: create the job record.
        let Self {
            exec, deps, config, job, ..
        } = self;
        let record_id: String = exec
            .activity("create_job_record", config.timeouts.job_store(), || {
                deps.job_store.create_job(&job.owner_id, &job.goal, job.handle)
            })
            .await?;
        self.job.record_id = record_id;

        if self.config.orchestrator.send_started_notice {
            let Self {
                exec, deps, config, job, ..
            } = self;
            exec.activity_best_effort("send_task_started", config.timeouts.notify(), || {
                deps.notifier
                    .send_task_started(&job.notify_address, &job.owner_id, &job.goal)
            })
            .await?;
        }

        // PLANNING: classify the goal.
        let Self {
            exec, deps, config, job, ..
        } = self;
        let plan: PlanDecision = exec
            .activity("plan_strategy", config.timeouts.planning(), || {
                deps.planner.plan_strategy(&job.owner_id, &job.goal)
            })
            .await?;
        info!(
            "strategy decided (job_id={}, classification={})",
            self.job.handle, plan.classification
        );
        self.emit(EventPayload::StrategyDecided {
            classification: plan.classification.clone(),
        });

        match plan.strategy() {
            Strategy::Browser => self.run_browser(&plan).await,
            Strategy::Memory => self.resolve_from_memory(&plan).await,
            Strategy::Clarify => self.resolve_clarify(&plan).await,
        }
    }

    /// MEMORY_RESOLVE: answer from context, no session ever provisioned.
    async fn resolve_from_memory(
        &mut self,
        plan: &PlanDecision,
    ) -> Result<TaskOutcome, StewardCoreError> {
        self.update_status(JobStatus::Completed).await?;
        self.complete_with(plan.reasoning.clone()).await
    }

    /// CLARIFY: ask the owner for more information and suspend the job.
    async fn resolve_clarify(
        &mut self,
        plan: &PlanDecision,
    ) -> Result<TaskOutcome, StewardCoreError> {
        self.update_status(JobStatus::WaitingInfo).await?;
        let Self {
            exec, deps, config, job, ..
        } = self;
        let question = plan.reasoning.clone();
        exec.activity(
            "send_clarification_request",
            config.timeouts.notify(),
            || {
                deps.notifier.send_clarification_request(
                    &job.notify_address,
                    &job.owner_id,
                    &job.goal,
                    &question,
                )
            },
        )
        .await?;
        self.save_outcome_memory(&plan.reasoning).await?;
        Ok(self.outcome(JobStatus::WaitingInfo, plan.reasoning.clone()))
    }

    /// BROWSER_LOOP: provision a session and run the bounded turn loop.
    async fn run_browser(&mut self, plan: &PlanDecision) -> Result<TaskOutcome, StewardCoreError> {
        let Self {
            exec, deps, config, job, ..
        } = self;
        let session: SessionHandle = exec
            .activity("provision_session", config.timeouts.provision(), || {
                deps.browser.provision_session(&job.owner_id, &job.record_id)
            })
            .await?;
        info!(
            "session provisioned (job_id={}, session={})",
            self.job.handle, session
        );
        self.session = Some(session.clone());
        self.update_status(JobStatus::Running).await?;

        match self.run_turn_loop(plan, &session).await? {
            LoopOutcome::Finished { summary } => {
                self.update_status(JobStatus::Completed).await?;
                self.complete_with(summary).await
            }
            LoopOutcome::CeilingReached { summary } => {
                // Deliberate never-hang-forever policy: report complete with
                // caveats using the last reasoning text.
                warn!(
                    "turn ceiling reached without finish (job_id={}, ceiling={})",
                    self.job.handle, self.config.orchestrator.max_turns
                );
                self.update_status(JobStatus::Completed).await?;
                self.complete_with(summary).await
            }
            LoopOutcome::Killed => self.terminate_killed().await,
            LoopOutcome::Rejected => {
                self.update_status(JobStatus::Rejected).await?;
                self.send_termination_notice(
                    JobStatus::Rejected,
                    "Owner rejected the high-stakes action.",
                )
                .await?;
                Ok(self.outcome(
                    JobStatus::Rejected,
                    "Task aborted: owner rejected the high-stakes action.".to_string(),
                ))
            }
            LoopOutcome::DeadlineElapsed { action } => {
                let detail = format!(
                    "approval request for `{action}` expired after {}s with no decision",
                    self.config.orchestrator.approval_deadline_secs
                );
                self.update_status(JobStatus::Failed).await?;
                self.send_termination_notice(JobStatus::Failed, &detail).await?;
                Ok(self.outcome(JobStatus::Failed, detail))
            }
        }
    }

    /// COMPLETING: one completion notice, one memory write.
    async fn complete_with(&mut self, summary: String) -> Result<TaskOutcome, StewardCoreError> {
        let Self {
            exec, deps, config, job, ..
        } = self;
        let body = summary.clone();
        let delivered = exec
            .activity_best_effort("send_completion", config.timeouts.notify(), || {
                deps.notifier
                    .send_completion(&job.notify_address, &job.owner_id, &job.goal, &body)
            })
            .await?;
        self.save_outcome_memory(&summary).await?;

        let summary = if delivered {
            summary
        } else {
            format!("{summary} (completion notice could not be delivered)")
        };
        Ok(self.outcome(JobStatus::Completed, summary))
    }

    /// Terminal kill handling: status and notice are best-effort; nothing
    /// may stand between an observed kill and the job ending.
    pub(super) async fn terminate_killed(&mut self) -> Result<TaskOutcome, StewardCoreError> {
        info!("job killed by owner (job_id={})", self.job.handle);
        let Self {
            exec, deps, config, job, ..
        } = self;
        exec.activity_best_effort("update_job_status", config.timeouts.job_store(), || {
            deps.job_store.update_status(&job.record_id, JobStatus::Killed)
        })
        .await?;
        self.send_termination_notice(JobStatus::Killed, "Task killed by owner.")
            .await?;
        Ok(self.outcome(JobStatus::Killed, "Task killed by owner.".to_string()))
    }

    /// FAILED: report the error and notify the owner, best-effort.
    async fn fail(&mut self, err: StewardCoreError) -> Result<TaskOutcome, StewardCoreError> {
        error!("job failed (job_id={}, error={})", self.job.handle, err);
        if matches!(
            err,
            StewardCoreError::Journal(_) | StewardCoreError::ReplayDivergence(_)
        ) {
            // The journal itself is broken; further recording would lie.
            return Err(err);
        }
        let detail = err.to_string();
        let Self {
            exec, deps, config, job, ..
        } = self;
        exec.activity_best_effort("update_job_status", config.timeouts.job_store(), || {
            deps.job_store.update_status(&job.record_id, JobStatus::Failed)
        })
        .await?;
        self.send_termination_notice(JobStatus::Failed, &detail).await?;
        Ok(self.outcome(JobStatus::Failed, format!("Task failed: {detail}")))
    }

    /// Guaranteed cleanup: release the session at most once, swallow release
    /// failures, never block the outcome.
    async fn cleanup(&mut self) -> Result<(), StewardCoreError> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        let Self {
            exec, deps, config, job, ..
        } = self;
        let released = exec
            .activity_best_effort("release_session", config.timeouts.release(), || {
                deps.browser.release_session(&session)
            })
            .await?;
        if !released {
            warn!(
                "session release failed, leaking upstream (job_id={}, session={})",
                job.handle, session
            );
        }
        Ok(())
    }

    /// Strict status update; used on every transition except the kill and
    /// failure paths, where it degrades to best-effort.
    pub(super) async fn update_status(
        &mut self,
        status: JobStatus,
    ) -> Result<(), StewardCoreError> {
        let Self {
            exec, deps, config, job, ..
        } = self;
        exec.activity("update_job_status", config.timeouts.job_store(), || {
            deps.job_store.update_status(&job.record_id, status)
        })
        .await?;
        job.status = status;
        Ok(())
    }

    /// One termination notice for rejected/killed/failed jobs.
    pub(super) async fn send_termination_notice(
        &mut self,
        status: JobStatus,
        detail: &str,
    ) -> Result<(), StewardCoreError> {
        let Self {
            exec, deps, config, job, ..
        } = self;
        exec.activity_best_effort("send_termination", config.timeouts.notify(), || {
            deps.notifier
                .send_termination(&job.notify_address, &job.owner_id, &job.goal, status, detail)
        })
        .await?;
        Ok(())
    }

    /// Persist the job outcome to long-term memory, best-effort.
    async fn save_outcome_memory(&mut self, outcome: &str) -> Result<(), StewardCoreError> {
        let Self {
            exec, deps, config, job, ..
        } = self;
        exec.activity_best_effort("save_outcome_memory", config.timeouts.memory(), || {
            deps.memory.save_outcome(&job.owner_id, &job.goal, outcome)
        })
        .await?;
        Ok(())
    }

    /// The goal text used for the next turn: the original goal plus the
    /// accumulated owner-message addendum.
    pub(super) fn working_goal(&self) -> String {
        if self.merged_messages.is_empty() {
            return self.job.goal.clone();
        }
        format!(
            "{}\n\n{USER_UPDATE_DELIMITER}\n{}",
            self.job.goal,
            self.merged_messages.join("\n")
        )
    }

    pub(super) fn outcome(&self, status: JobStatus, summary: String) -> TaskOutcome {
        TaskOutcome {
            job_id: self.job.handle,
            status,
            summary,
        }
    }
}

/// Why the turn loop handed control back to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum LoopOutcome {
    /// The turn executor reported the goal reached.
    Finished { summary: String },
    /// The iteration ceiling was hit without a finish.
    CeilingReached { summary: String },
    /// The kill flag was observed.
    Killed,
    /// The owner rejected a gated action.
    Rejected,
    /// An approval wait expired with no decision.
    DeadlineElapsed { action: String },
}

//! The approval gate: suspend until a human decides, bounded by a deadline.

use crate::error::StewardCoreError;
use crate::orchestrator::workflow::JobRun;
use chrono::Utc;
use log::{info, warn};
use std::time::Duration;
use steward_rs_protocol::{Decision, EventPayload, GateOutcome, JobStatus};
use tokio::time::timeout;

impl JobRun {
    /// Block forward progress on a described high-risk action until the
    /// owner responds, the kill flag is raised, or the deadline elapses.
    ///
    /// The deadline is measured from the journaled gate-open time, so a
    /// process restart mid-wait resumes with the remaining time rather than
    /// a fresh window. At most one gate is open per job at any time; the
    /// turn loop only calls this between turns.
    pub(super) async fn wait_for_approval(
        &mut self,
        action: &str,
    ) -> Result<GateOutcome, StewardCoreError> {
        let opened_at = self.exec.open_gate(action)?;
        info!(
            "approval gate opened (job_id={}, action_len={})",
            self.job.handle,
            action.len()
        );
        self.emit(EventPayload::ApprovalRequested {
            action: action.to_string(),
        });

        self.update_status(JobStatus::WaitingApproval).await?;

        let Self {
            exec, deps, config, job, ..
        } = self;
        let notified: bool = exec
            .activity("request_approval", config.timeouts.notify(), || {
                deps.notifier.send_approval_request(
                    &job.notify_address,
                    &job.owner_id,
                    job.handle,
                    action,
                )
            })
            .await?;
        if !notified {
            // The collaborator absorbed a delivery problem; keep waiting,
            // the owner can still resolve the gate through another surface.
            warn!(
                "approval request not confirmed delivered (job_id={})",
                job.handle
            );
        }

        let outcome = match self.exec.replay_gate_outcome()? {
            Some(outcome) => outcome,
            None => {
                let outcome = self.await_decision(opened_at).await;
                self.exec.record_gate_outcome(outcome)?;
                outcome
            }
        };
        info!(
            "approval gate resolved (job_id={}, outcome={:?})",
            self.job.handle, outcome
        );
        self.emit(EventPayload::ApprovalResolved { outcome });

        match outcome {
            GateOutcome::Approved => {
                // Consume the decision so a stale approval cannot leak into
                // a later gate, then put the job back to work.
                self.control.clear_decision();
                self.update_status(JobStatus::Running).await?;
            }
            GateOutcome::Rejected => {
                self.control.clear_decision();
            }
            GateOutcome::Killed | GateOutcome::DeadlineElapsed => {}
        }
        Ok(outcome)
    }

    /// The live wait: kill has the highest precedence, then the decision
    /// slot, then the deadline.
    async fn await_decision(&self, opened_at: chrono::DateTime<Utc>) -> GateOutcome {
        let elapsed = (Utc::now() - opened_at).to_std().unwrap_or(Duration::ZERO);
        let remaining = self
            .config
            .orchestrator
            .approval_deadline()
            .saturating_sub(elapsed);
        if remaining.is_zero() {
            return GateOutcome::DeadlineElapsed;
        }

        let mut rx = self.control.subscribe();
        let waited = timeout(
            remaining,
            rx.wait_for(|state| state.killed || state.decision.is_some()),
        )
        .await;
        match waited {
            Err(_) => GateOutcome::DeadlineElapsed,
            Ok(Err(_)) => {
                warn!(
                    "control channel closed during gate wait (job_id={})",
                    self.job.handle
                );
                GateOutcome::DeadlineElapsed
            }
            Ok(Ok(state)) => {
                if state.killed {
                    GateOutcome::Killed
                } else {
                    match state.decision {
                        Some(Decision::Approved) => GateOutcome::Approved,
                        Some(Decision::Rejected) => GateOutcome::Rejected,
                        None => GateOutcome::DeadlineElapsed,
                    }
                }
            }
        }
    }
}

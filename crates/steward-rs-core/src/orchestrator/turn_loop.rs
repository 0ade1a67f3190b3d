//! The bounded turn loop: observe → decide → act, at most `max_turns` times.

use crate::error::StewardCoreError;
use crate::orchestrator::workflow::{JobRun, LoopOutcome};
use log::{debug, info};
use steward_rs_protocol::{
    EventPayload, GateOutcome, PlanDecision, SessionHandle, TurnResult,
};

impl JobRun {
    /// Drive repeated turns until the executor finishes, the ceiling is hit,
    /// or a signal ends the job.
    ///
    /// Kill is checked first each iteration and again right after a turn
    /// returns, so a kill that lands while a turn is in flight discards the
    /// result instead of acting on it. Owner messages become visible only at
    /// these boundaries, which keeps replay deterministic.
    pub(super) async fn run_turn_loop(
        &mut self,
        plan: &PlanDecision,
        session: &SessionHandle,
    ) -> Result<LoopOutcome, StewardCoreError> {
        let max_turns = self.config.orchestrator.max_turns;
        let mut last_reasoning = String::new();

        for turn in 0..max_turns {
            if self.exec.observe_kill(&self.control)? {
                return Ok(LoopOutcome::Killed);
            }

            let drained = self.exec.drain_messages(&self.control)?;
            if !drained.is_empty() {
                info!(
                    "merging owner messages into goal (job_id={}, count={})",
                    self.job.handle,
                    drained.len()
                );
                self.emit(EventPayload::MessagesMerged {
                    count: drained.len(),
                });
                self.merged_messages.extend(drained);
            }

            self.emit(EventPayload::TurnStarted { turn });
            let goal = self.working_goal();
            let Self {
                exec, deps, config, job, ..
            } = self;
            let result: TurnResult = exec
                .activity("execute_turn", config.timeouts.turn(), || {
                    deps.browser.execute_turn(
                        session,
                        &goal,
                        &job.owner_id,
                        &plan.profile_context,
                        &job.record_id,
                    )
                })
                .await?;
            debug!(
                "turn complete (job_id={}, turn={}, finished={}, action={:?})",
                self.job.handle, turn, result.finished, result.action_taken
            );
            self.emit(EventPayload::TurnCompleted {
                turn,
                finished: result.finished,
            });
            last_reasoning = result.reasoning.clone();

            // A kill that arrived mid-turn wins over whatever the turn said.
            if self.exec.observe_kill(&self.control)? {
                return Ok(LoopOutcome::Killed);
            }

            let risky = result.requires_approval || self.risk.assess(&result).is_some();
            if risky {
                let action = result.approval_description().to_string();
                match self.wait_for_approval(&action).await? {
                    GateOutcome::Approved => {}
                    GateOutcome::Rejected => return Ok(LoopOutcome::Rejected),
                    GateOutcome::Killed => return Ok(LoopOutcome::Killed),
                    GateOutcome::DeadlineElapsed => {
                        return Ok(LoopOutcome::DeadlineElapsed { action });
                    }
                }
            }

            if result.finished {
                return Ok(LoopOutcome::Finished {
                    summary: last_reasoning,
                });
            }
        }

        Ok(LoopOutcome::CeilingReached {
            summary: last_reasoning,
        })
    }
}

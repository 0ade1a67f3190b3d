//! Replay and resume properties of the durable journal.

use chrono::{Duration as ChronoDuration, Utc};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use steward_rs_config::StewardConfig;
use steward_rs_core::{
    Collaborators, JournalEvent, JournalStore, JsonlJournalStore, Orchestrator, StewardCoreError,
};
use steward_rs_protocol::{JobId, JobStatus, PlanDecision};
use steward_rs_test_utils::{
    FailingPlanner, FixedPlanner, InMemoryJobStore, RecordingMemory, RecordingNotifier,
    ScriptedBrowserHost, approval_turn, final_turn, turn,
};
use tokio::time::sleep;
use uuid::Uuid;

struct Harness {
    orchestrator: Arc<Orchestrator>,
    store: InMemoryJobStore,
    notifier: RecordingNotifier,
    host: ScriptedBrowserHost,
}

fn harness_with_journal(
    planner: impl steward_rs_protocol::Planner + 'static,
    host: ScriptedBrowserHost,
    journal: Arc<dyn JournalStore>,
) -> Harness {
    let store = InMemoryJobStore::new();
    let notifier = RecordingNotifier::new();
    let collaborators = Collaborators {
        job_store: Arc::new(store.clone()),
        planner: Arc::new(planner),
        browser: Arc::new(host.clone()),
        notifier: Arc::new(notifier.clone()),
        memory: Arc::new(RecordingMemory::new()),
    };
    let orchestrator = Orchestrator::new(StewardConfig::default(), collaborators)
        .expect("build orchestrator")
        .with_journal_store(journal);
    Harness {
        orchestrator: Arc::new(orchestrator),
        store,
        notifier,
        host,
    }
}

fn job_started(job_id: JobId, goal: &str) -> JournalEvent {
    JournalEvent::JobStarted {
        job_id,
        goal: goal.to_string(),
        owner_id: "owner-1".to_string(),
        notify_address: "owner@example.com".to_string(),
        started_at: Utc::now(),
    }
}

fn activity(name: &str, result: serde_json::Value) -> JournalEvent {
    JournalEvent::ActivityCompleted {
        name: name.to_string(),
        result,
    }
}

fn browser_plan() -> serde_json::Value {
    serde_json::to_value(PlanDecision {
        classification: "browser".to_string(),
        reasoning: "needs a live session".to_string(),
        profile_context: serde_json::json!({ "profile": "test" }),
    })
    .expect("serialize plan")
}

/// Resuming a finished job is a pure read of the recorded outcome.
#[tokio::test]
async fn resume_of_finished_job_returns_recorded_outcome() {
    let temp = tempfile::tempdir().expect("tempdir");
    let journal: Arc<dyn JournalStore> =
        Arc::new(JsonlJournalStore::new(temp.path()).expect("journal"));
    let harness = harness_with_journal(
        FixedPlanner::browser(),
        ScriptedBrowserHost::new(vec![final_turn("done on the first pass")]),
        journal.clone(),
    );

    let outcome = harness
        .orchestrator
        .run("one-shot task", "owner-1", "owner@example.com")
        .await
        .expect("run");
    assert_eq!(outcome.status, JobStatus::Completed);
    let turns_before = harness.host.calls().turns;
    let notices_before = harness.notifier.terminal_notices();

    let resumed = harness
        .orchestrator
        .resume(outcome.job_id)
        .await
        .expect("resume");
    assert_eq!(resumed, outcome);
    // No collaborator ran again.
    assert_eq!(harness.host.calls().turns, turns_before);
    assert_eq!(harness.notifier.terminal_notices(), notices_before);
}

/// Resuming mid-loop replays completed activities without re-invoking their
/// collaborators, then finishes the remaining work live.
#[tokio::test]
async fn resume_mid_loop_replays_completed_activities_exactly_once() {
    let temp = tempfile::tempdir().expect("tempdir");
    let journal: Arc<dyn JournalStore> =
        Arc::new(JsonlJournalStore::new(temp.path()).expect("journal"));
    let job_id = Uuid::new_v4();

    // Journal as left behind by a process that crashed after one turn.
    let recorded = [
        job_started(job_id, "finish the report"),
        activity("create_job_record", serde_json::json!("job-9")),
        activity("send_task_started", serde_json::json!(true)),
        activity("plan_strategy", browser_plan()),
        activity("provision_session", serde_json::json!("session-job-9")),
        activity("update_job_status", serde_json::Value::Null),
        activity(
            "execute_turn",
            serde_json::to_value(turn("gathering the numbers")).expect("turn"),
        ),
    ];
    for event in &recorded {
        journal.append(job_id, event).expect("seed journal");
    }

    // The planner would fail if consulted again; the journal must answer.
    let harness = harness_with_journal(
        FailingPlanner::terminal(),
        ScriptedBrowserHost::new(vec![final_turn("report filed; goal reached")]),
        journal.clone(),
    );

    let outcome = harness
        .orchestrator
        .resume(job_id)
        .await
        .expect("resume");
    assert_eq!(outcome.status, JobStatus::Completed);
    assert_eq!(outcome.summary, "report filed; goal reached".to_string());

    let calls = harness.host.calls();
    // Only the live second turn ran; provisioning was replayed.
    assert_eq!(calls.provisioned, 0);
    assert_eq!(calls.turns, 1);
    assert_eq!(calls.released, 1);
    // The live status update lands on the replayed record id.
    assert_eq!(harness.store.last_status("job-9"), Some(JobStatus::Completed));

    // A second resume now sees the terminal record and re-runs nothing.
    let resumed = harness.orchestrator.resume(job_id).await.expect("resume");
    assert_eq!(resumed, outcome);
    assert_eq!(harness.host.calls().turns, 1);
}

/// Resuming mid-gate keeps the original deadline and does not resend the
/// approval request; a live approval then resumes the loop.
#[tokio::test]
async fn resume_mid_gate_waits_out_the_original_deadline() {
    let temp = tempfile::tempdir().expect("tempdir");
    let journal: Arc<dyn JournalStore> =
        Arc::new(JsonlJournalStore::new(temp.path()).expect("journal"));
    let job_id = Uuid::new_v4();

    let gated_turn = approval_turn("ready to confirm order", "confirm the order");
    let recorded = [
        job_started(job_id, "order the parts"),
        activity("create_job_record", serde_json::json!("job-9")),
        activity("send_task_started", serde_json::json!(true)),
        activity("plan_strategy", browser_plan()),
        activity("provision_session", serde_json::json!("session-job-9")),
        activity("update_job_status", serde_json::Value::Null),
        activity(
            "execute_turn",
            serde_json::to_value(gated_turn).expect("turn"),
        ),
        JournalEvent::GateOpened {
            action: "confirm the order".to_string(),
            opened_at: Utc::now() - ChronoDuration::hours(1),
        },
        activity("update_job_status", serde_json::Value::Null),
        activity("request_approval", serde_json::json!(true)),
    ];
    for event in &recorded {
        journal.append(job_id, event).expect("seed journal");
    }

    let harness = harness_with_journal(
        FailingPlanner::terminal(),
        ScriptedBrowserHost::new(vec![final_turn("order confirmed; goal reached")]),
        journal.clone(),
    );

    let orchestrator = harness.orchestrator.clone();
    let run = tokio::spawn(async move { orchestrator.resume(job_id).await });

    // Give the resume a moment to re-enter the gate wait, then approve.
    sleep(Duration::from_millis(100)).await;
    assert_eq!(harness.orchestrator.approve(job_id), true);

    let outcome = run.await.expect("join").expect("resume");
    assert_eq!(outcome.status, JobStatus::Completed);
    // The approval request was replayed, not resent.
    assert_eq!(harness.notifier.approval_requests().len(), 0);
    assert_eq!(harness.host.calls().turns, 1);
}

/// A gate whose recorded deadline already passed fails immediately on
/// resume instead of granting a fresh wait window.
#[tokio::test]
async fn resume_past_gate_deadline_fails_without_waiting() {
    let temp = tempfile::tempdir().expect("tempdir");
    let journal: Arc<dyn JournalStore> =
        Arc::new(JsonlJournalStore::new(temp.path()).expect("journal"));
    let job_id = Uuid::new_v4();

    let gated_turn = approval_turn("ready to confirm order", "confirm the order");
    let recorded = [
        job_started(job_id, "order the parts"),
        activity("create_job_record", serde_json::json!("job-9")),
        activity("send_task_started", serde_json::json!(true)),
        activity("plan_strategy", browser_plan()),
        activity("provision_session", serde_json::json!("session-job-9")),
        activity("update_job_status", serde_json::Value::Null),
        activity(
            "execute_turn",
            serde_json::to_value(gated_turn).expect("turn"),
        ),
        JournalEvent::GateOpened {
            action: "confirm the order".to_string(),
            opened_at: Utc::now() - ChronoDuration::hours(25),
        },
        activity("update_job_status", serde_json::Value::Null),
        activity("request_approval", serde_json::json!(true)),
    ];
    for event in &recorded {
        journal.append(job_id, event).expect("seed journal");
    }

    let harness = harness_with_journal(
        FailingPlanner::terminal(),
        ScriptedBrowserHost::new(vec![final_turn("should never run")]),
        journal.clone(),
    );

    let outcome = harness
        .orchestrator
        .resume(job_id)
        .await
        .expect("resume");
    assert_eq!(outcome.status, JobStatus::Failed);
    assert_eq!(outcome.summary.contains("expired"), true);
    assert_eq!(harness.host.calls().turns, 0);
    assert_eq!(harness.host.calls().released, 1);
}

/// Unknown jobs and journals that do not start with a start record are
/// reported as errors, never silently re-run.
#[tokio::test]
async fn resume_rejects_unknown_and_malformed_journals() {
    let temp = tempfile::tempdir().expect("tempdir");
    let journal: Arc<dyn JournalStore> =
        Arc::new(JsonlJournalStore::new(temp.path()).expect("journal"));
    let harness = harness_with_journal(
        FixedPlanner::browser(),
        ScriptedBrowserHost::new(Vec::new()),
        journal.clone(),
    );

    let unknown = Uuid::new_v4();
    let err = harness
        .orchestrator
        .resume(unknown)
        .await
        .expect_err("unknown job");
    match err {
        StewardCoreError::UnknownJob(id) => assert_eq!(id, unknown),
        other => panic!("unexpected error: {other:?}"),
    }

    let malformed = Uuid::new_v4();
    journal
        .append(malformed, &JournalEvent::KillObserved)
        .expect("seed journal");
    let err = harness
        .orchestrator
        .resume(malformed)
        .await
        .expect_err("malformed journal");
    match err {
        StewardCoreError::ReplayDivergence(message) => {
            assert_eq!(message.contains("start record"), true);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

/// Divergence between the recorded history and the live code path is an
/// explicit error, not silent corruption.
#[tokio::test]
async fn replay_divergence_is_an_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let journal: Arc<dyn JournalStore> =
        Arc::new(JsonlJournalStore::new(temp.path()).expect("journal"));
    let job_id = Uuid::new_v4();

    let recorded = [
        job_started(job_id, "finish the report"),
        activity("plan_strategy", browser_plan()),
    ];
    for event in &recorded {
        journal.append(job_id, event).expect("seed journal");
    }

    let harness = harness_with_journal(
        FixedPlanner::browser(),
        ScriptedBrowserHost::new(Vec::new()),
        journal.clone(),
    );

    // The code path expects `create_job_record` first; the journal disagrees.
    let err = harness
        .orchestrator
        .resume(job_id)
        .await
        .expect_err("diverged");
    match err {
        StewardCoreError::ReplayDivergence(message) => {
            assert_eq!(message.contains("create_job_record"), true);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

/// A journaled first run and its resume observe the same activity sequence:
/// nothing is double-applied across the restart boundary.
#[tokio::test]
async fn journaled_run_records_a_replayable_history() {
    let temp = tempfile::tempdir().expect("tempdir");
    let journal: Arc<dyn JournalStore> =
        Arc::new(JsonlJournalStore::new(temp.path()).expect("journal"));
    let harness = harness_with_journal(
        FixedPlanner::browser(),
        ScriptedBrowserHost::new(vec![
            turn("first pass"),
            final_turn("second pass; goal reached"),
        ]),
        journal.clone(),
    );

    let outcome = harness
        .orchestrator
        .run("two-pass task", "owner-1", "owner@example.com")
        .await
        .expect("run");
    assert_eq!(outcome.status, JobStatus::Completed);

    let events = journal
        .load(outcome.job_id)
        .expect("load")
        .expect("recorded");
    let names: Vec<String> = events
        .iter()
        .filter_map(|event| match event {
            JournalEvent::ActivityCompleted { name, .. } => Some(name.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(
        names,
        vec![
            "create_job_record".to_string(),
            "send_task_started".to_string(),
            "plan_strategy".to_string(),
            "provision_session".to_string(),
            "update_job_status".to_string(),
            "execute_turn".to_string(),
            "execute_turn".to_string(),
            "update_job_status".to_string(),
            "send_completion".to_string(),
            "save_outcome_memory".to_string(),
            "release_session".to_string(),
        ]
    );
    assert_eq!(
        events.last(),
        Some(&JournalEvent::JobFinished {
            status: JobStatus::Completed,
            summary: "second pass; goal reached".to_string(),
        })
    );
}

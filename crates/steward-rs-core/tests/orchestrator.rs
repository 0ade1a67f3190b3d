//! End-to-end orchestrator scenarios with scripted collaborators.

use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use steward_rs_config::{OrchestratorConfig, StewardConfig};
use steward_rs_core::{Collaborators, Orchestrator, TaskOutcome};
use steward_rs_protocol::{JobStatus, Planner, TurnResult};
use steward_rs_test_utils::{
    FixedPlanner, InMemoryJobStore, NotifierCall, RecordingMemory, RecordingNotifier,
    ScriptedBrowserHost, approval_turn, final_turn, turn,
};
use tokio::time::sleep;

struct Harness {
    orchestrator: Arc<Orchestrator>,
    store: InMemoryJobStore,
    notifier: RecordingNotifier,
    memory: RecordingMemory,
    host: ScriptedBrowserHost,
}

fn harness(planner: impl Planner + 'static, host: ScriptedBrowserHost) -> Harness {
    harness_with_config(planner, host, StewardConfig::default())
}

fn harness_with_config(
    planner: impl Planner + 'static,
    host: ScriptedBrowserHost,
    config: StewardConfig,
) -> Harness {
    let store = InMemoryJobStore::new();
    let notifier = RecordingNotifier::new();
    let memory = RecordingMemory::new();
    let collaborators = Collaborators {
        job_store: Arc::new(store.clone()),
        planner: Arc::new(planner),
        browser: Arc::new(host.clone()),
        notifier: Arc::new(notifier.clone()),
        memory: Arc::new(memory.clone()),
    };
    let orchestrator = Orchestrator::new(config, collaborators).expect("build orchestrator");
    Harness {
        orchestrator: Arc::new(orchestrator),
        store,
        notifier,
        memory,
        host,
    }
}

/// Poll until a condition holds; panics after ~5 seconds.
async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        sleep(Duration::from_millis(25)).await;
    }
    panic!("condition never reached: {what}");
}

/// Scenario A: three turns, no approval, clean completion.
#[tokio::test]
async fn browser_goal_completes_after_three_turns() {
    let harness = harness(
        FixedPlanner::browser(),
        ScriptedBrowserHost::new(vec![
            turn("opening the vendor portal"),
            turn("navigating to the billing page"),
            final_turn("downloaded the invoice; goal reached"),
        ]),
    );

    let outcome = harness
        .orchestrator
        .run("download the latest invoice", "owner-1", "owner@example.com")
        .await
        .expect("run");

    assert_eq!(outcome.status, JobStatus::Completed);
    assert_eq!(outcome.summary, "downloaded the invoice; goal reached".to_string());

    let calls = harness.host.calls();
    assert_eq!(calls.provisioned, 1);
    assert_eq!(calls.turns, 3);
    assert_eq!(calls.released, 1);

    assert_eq!(harness.notifier.terminal_notices(), 1);
    assert_eq!(
        harness.store.last_status("job-1"),
        Some(JobStatus::Completed)
    );
    assert_eq!(harness.memory.saved().len(), 1);
}

/// Scenario B: turn two flags an approval; the owner rejects; no turn three.
#[tokio::test]
async fn rejected_approval_stops_the_job() {
    let harness = harness(
        FixedPlanner::browser(),
        ScriptedBrowserHost::new(vec![
            turn("collecting the file list"),
            approval_turn("ready to clear the folder", "delete all files"),
            final_turn("should never run"),
        ]),
    );

    let orchestrator = harness.orchestrator.clone();
    let run = tokio::spawn(async move {
        orchestrator
            .run("clean up the shared folder", "owner-1", "owner@example.com")
            .await
    });

    let notifier = harness.notifier.clone();
    wait_until("approval requested", || {
        !notifier.approval_requests().is_empty()
    })
    .await;
    assert_eq!(
        harness.notifier.approval_requests(),
        vec!["delete all files".to_string()]
    );

    let handle = harness.store.handles()[0];
    assert_eq!(harness.orchestrator.reject(handle), true);

    let outcome = run.await.expect("join").expect("run");
    assert_eq!(outcome.status, JobStatus::Rejected);

    let calls = harness.host.calls();
    assert_eq!(calls.turns, 2);
    assert_eq!(calls.released, 1);
    assert_eq!(
        harness.store.last_status("job-1"),
        Some(JobStatus::Rejected)
    );
    let terminations: Vec<JobStatus> = harness
        .notifier
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            NotifierCall::Termination { status, .. } => Some(status),
            _ => None,
        })
        .collect();
    assert_eq!(terminations, vec![JobStatus::Rejected]);
}

/// Scenario D: memory strategy never provisions a session.
#[tokio::test]
async fn memory_strategy_resolves_without_a_session() {
    let harness = harness(
        FixedPlanner::memory("the invoice was already paid on the 3rd"),
        ScriptedBrowserHost::new(Vec::new()),
    );

    let outcome = harness
        .orchestrator
        .run("was the invoice paid?", "owner-1", "owner@example.com")
        .await
        .expect("run");

    assert_eq!(outcome.status, JobStatus::Completed);
    assert_eq!(
        outcome.summary,
        "the invoice was already paid on the 3rd".to_string()
    );
    assert_eq!(harness.host.calls(), steward_rs_test_utils::BrowserCalls::default());
    assert_eq!(harness.notifier.terminal_notices(), 1);
    assert_eq!(harness.memory.saved().len(), 1);
    assert_eq!(
        harness.store.last_status("job-1"),
        Some(JobStatus::Completed)
    );
}

/// Clarify strategy suspends the job and asks the owner for more detail.
#[tokio::test]
async fn clarify_strategy_requests_more_information() {
    let harness = harness(
        FixedPlanner::clarify("which account should the transfer come from?"),
        ScriptedBrowserHost::new(Vec::new()),
    );

    let outcome = harness
        .orchestrator
        .run("move the money", "owner-1", "owner@example.com")
        .await
        .expect("run");

    assert_eq!(outcome.status, JobStatus::WaitingInfo);
    assert_eq!(harness.host.calls().provisioned, 0);
    assert_eq!(
        harness.store.last_status("job-1"),
        Some(JobStatus::WaitingInfo)
    );
    let clarifications: Vec<String> = harness
        .notifier
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            NotifierCall::Clarification { question } => Some(question),
            _ => None,
        })
        .collect();
    assert_eq!(
        clarifications,
        vec!["which account should the transfer come from?".to_string()]
    );
}

/// An unknown classification falls back to the memory path, never a crash.
#[tokio::test]
async fn unknown_classification_falls_back_to_memory() {
    let harness = harness(
        FixedPlanner::new("escalate", "unrecognized plan"),
        ScriptedBrowserHost::new(Vec::new()),
    );

    let outcome = harness
        .orchestrator
        .run("do the thing", "owner-1", "owner@example.com")
        .await
        .expect("run");

    assert_eq!(outcome.status, JobStatus::Completed);
    assert_eq!(harness.host.calls().provisioned, 0);
}

/// The turn loop never issues more than the configured ceiling of turns and
/// reports complete-with-caveats using the last reasoning text.
#[tokio::test]
async fn turn_ceiling_completes_with_caveats() {
    let harness = harness(
        FixedPlanner::browser(),
        ScriptedBrowserHost::new(vec![turn("still looking for the right page")]),
    );

    let outcome = harness
        .orchestrator
        .run("find the contract", "owner-1", "owner@example.com")
        .await
        .expect("run");

    assert_eq!(outcome.status, JobStatus::Completed);
    assert_eq!(
        outcome.summary,
        "still looking for the right page".to_string()
    );
    assert_eq!(harness.host.calls().turns, 20);
    assert_eq!(harness.notifier.terminal_notices(), 1);
    assert_eq!(harness.host.calls().released, 1);
}

/// Keyword risk detection gates a turn that never set the explicit flag, and
/// an approval resumes the loop.
#[tokio::test]
async fn keyword_match_gates_and_approval_resumes() {
    let harness = harness(
        FixedPlanner::browser(),
        ScriptedBrowserHost::new(vec![
            turn("I will now delete the duplicate entries"),
            final_turn("duplicates cleared; goal reached"),
        ]),
    );

    let orchestrator = harness.orchestrator.clone();
    let run = tokio::spawn(async move {
        orchestrator
            .run("tidy the address book", "owner-1", "owner@example.com")
            .await
    });

    let notifier = harness.notifier.clone();
    wait_until("approval requested", || {
        !notifier.approval_requests().is_empty()
    })
    .await;
    // No explicit approval_action, so the gate shows the reasoning text.
    assert_eq!(
        harness.notifier.approval_requests(),
        vec!["I will now delete the duplicate entries".to_string()]
    );

    let handle = harness.store.handles()[0];
    assert_eq!(harness.orchestrator.approve(handle), true);

    let outcome = run.await.expect("join").expect("run");
    assert_eq!(outcome.status, JobStatus::Completed);
    assert_eq!(harness.host.calls().turns, 2);

    let statuses: Vec<JobStatus> = harness
        .store
        .status_history()
        .into_iter()
        .map(|(_, status)| status)
        .collect();
    assert_eq!(
        statuses,
        vec![
            JobStatus::Running,
            JobStatus::WaitingApproval,
            JobStatus::Running,
            JobStatus::Completed,
        ]
    );

    // A stale approve after resolution has no effect on the finished job.
    assert_eq!(harness.orchestrator.approve(handle), true);
    assert_eq!(
        harness.store.last_status("job-1"),
        Some(JobStatus::Completed)
    );
}

/// A rate-limited turn surfaces as a graceful completion, not a retry storm.
#[tokio::test]
async fn rate_limited_turn_completes_gracefully() {
    let rate_limited = TurnResult {
        reasoning: "rate limit encountered: upstream 429".to_string(),
        finished: true,
        error_kind: Some(steward_rs_protocol::TurnErrorKind::RateLimit),
        ..TurnResult::default()
    };
    let harness = harness(
        FixedPlanner::browser(),
        ScriptedBrowserHost::new(vec![rate_limited]),
    );

    let outcome = harness
        .orchestrator
        .run("scrape the listings", "owner-1", "owner@example.com")
        .await
        .expect("run");

    assert_eq!(outcome.status, JobStatus::Completed);
    assert_eq!(harness.host.calls().turns, 1);
    assert_eq!(harness.notifier.terminal_notices(), 1);
}

/// An unclassified activity failure propagates to FAILED with one
/// termination notice and a released session.
#[tokio::test]
async fn terminal_activity_failure_fails_the_job() {
    let harness = harness(
        steward_rs_test_utils::FailingPlanner::terminal(),
        ScriptedBrowserHost::new(Vec::new()),
    );

    let outcome = harness
        .orchestrator
        .run("anything", "owner-1", "owner@example.com")
        .await
        .expect("run returns the failure outcome");

    assert_eq!(outcome.status, JobStatus::Failed);
    assert_eq!(harness.store.last_status("job-1"), Some(JobStatus::Failed));
    assert_eq!(harness.notifier.terminal_notices(), 1);
    assert_eq!(harness.host.calls().provisioned, 0);
}

/// The approval deadline elapsing with no decision terminates as failed.
#[tokio::test]
async fn approval_deadline_elapse_fails_the_job() {
    let config = StewardConfig::builder()
        .orchestrator(OrchestratorConfig {
            max_turns: 20,
            approval_deadline_secs: 1,
            send_started_notice: true,
        })
        .build();
    let harness = harness_with_config(
        FixedPlanner::browser(),
        ScriptedBrowserHost::new(vec![approval_turn(
            "about to submit the form",
            "submit the application",
        )]),
        config,
    );

    let outcome = harness
        .orchestrator
        .run("apply for the permit", "owner-1", "owner@example.com")
        .await
        .expect("run");

    assert_eq!(outcome.status, JobStatus::Failed);
    assert_eq!(outcome.summary.contains("expired"), true);
    assert_eq!(harness.host.calls().turns, 1);
    assert_eq!(harness.host.calls().released, 1);
    assert_eq!(harness.store.last_status("job-1"), Some(JobStatus::Failed));
}

/// Outcomes are plain values: the same completed outcome is returned to the
/// caller and reflected in the persisted record.
#[tokio::test]
async fn outcome_matches_persisted_state() {
    let harness = harness(
        FixedPlanner::memory("answer from context"),
        ScriptedBrowserHost::new(Vec::new()),
    );

    let outcome: TaskOutcome = harness
        .orchestrator
        .run("quick question", "owner-1", "owner@example.com")
        .await
        .expect("run");
    let handle = harness.store.handles()[0];
    assert_eq!(outcome.job_id, handle);
    assert_eq!(outcome.status, JobStatus::Completed);
}

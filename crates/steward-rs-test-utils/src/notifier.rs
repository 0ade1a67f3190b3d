use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use steward_rs_protocol::{ActivityError, JobId, JobStatus, Notifier, OwnerId};

/// One recorded outbound notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierCall {
    TaskStarted,
    ApprovalRequest { handle: JobId, action: String },
    Clarification { question: String },
    Completion { summary: String },
    Termination { status: JobStatus, detail: String },
}

/// Notifier double that records every call.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    calls: Arc<Mutex<Vec<NotifierCall>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<NotifierCall> {
        self.calls.lock().clone()
    }

    /// Count of terminal notices (completion or termination).
    pub fn terminal_notices(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| {
                matches!(
                    call,
                    NotifierCall::Completion { .. } | NotifierCall::Termination { .. }
                )
            })
            .count()
    }

    pub fn approval_requests(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                NotifierCall::ApprovalRequest { action, .. } => Some(action.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_task_started(
        &self,
        _notify_address: &str,
        _owner_id: &OwnerId,
        _goal: &str,
    ) -> Result<(), ActivityError> {
        self.calls.lock().push(NotifierCall::TaskStarted);
        Ok(())
    }

    async fn send_approval_request(
        &self,
        _notify_address: &str,
        _owner_id: &OwnerId,
        handle: JobId,
        action: &str,
    ) -> Result<bool, ActivityError> {
        self.calls.lock().push(NotifierCall::ApprovalRequest {
            handle,
            action: action.to_string(),
        });
        Ok(true)
    }

    async fn send_clarification_request(
        &self,
        _notify_address: &str,
        _owner_id: &OwnerId,
        _goal: &str,
        question: &str,
    ) -> Result<(), ActivityError> {
        self.calls.lock().push(NotifierCall::Clarification {
            question: question.to_string(),
        });
        Ok(())
    }

    async fn send_completion(
        &self,
        _notify_address: &str,
        _owner_id: &OwnerId,
        _goal: &str,
        summary: &str,
    ) -> Result<(), ActivityError> {
        self.calls.lock().push(NotifierCall::Completion {
            summary: summary.to_string(),
        });
        Ok(())
    }

    async fn send_termination(
        &self,
        _notify_address: &str,
        _owner_id: &OwnerId,
        _goal: &str,
        status: JobStatus,
        detail: &str,
    ) -> Result<(), ActivityError> {
        self.calls.lock().push(NotifierCall::Termination {
            status,
            detail: detail.to_string(),
        });
        Ok(())
    }
}

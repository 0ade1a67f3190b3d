use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use steward_rs_protocol::{ActivityError, JobId, JobStatus, JobStore, OwnerId};

struct StoreState {
    next_id: u32,
    created: Vec<(String, OwnerId, String, JobId)>,
    statuses: Vec<(String, JobStatus)>,
}

/// Job store double tracking record creation and every status transition.
#[derive(Clone)]
pub struct InMemoryJobStore {
    state: Arc<Mutex<StoreState>>,
}

impl Default for InMemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState {
                next_id: 0,
                created: Vec::new(),
                statuses: Vec::new(),
            })),
        }
    }

    /// Record ids created so far.
    pub fn created_records(&self) -> Vec<String> {
        self.state
            .lock()
            .created
            .iter()
            .map(|(id, _, _, _)| id.clone())
            .collect()
    }

    /// Durable handles of the jobs created so far.
    pub fn handles(&self) -> Vec<JobId> {
        self.state
            .lock()
            .created
            .iter()
            .map(|(_, _, _, handle)| *handle)
            .collect()
    }

    /// Full status transition history across all records.
    pub fn status_history(&self) -> Vec<(String, JobStatus)> {
        self.state.lock().statuses.clone()
    }

    /// Latest status written for a record.
    pub fn last_status(&self, record_id: &str) -> Option<JobStatus> {
        self.state
            .lock()
            .statuses
            .iter()
            .rev()
            .find(|(id, _)| id == record_id)
            .map(|(_, status)| *status)
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create_job(
        &self,
        owner_id: &OwnerId,
        goal: &str,
        handle: JobId,
    ) -> Result<String, ActivityError> {
        let mut state = self.state.lock();
        state.next_id += 1;
        let record_id = format!("job-{}", state.next_id);
        state
            .created
            .push((record_id.clone(), owner_id.clone(), goal.to_string(), handle));
        Ok(record_id)
    }

    async fn update_status(
        &self,
        record_id: &str,
        status: JobStatus,
    ) -> Result<(), ActivityError> {
        self.state
            .lock()
            .statuses
            .push((record_id.to_string(), status));
        Ok(())
    }
}

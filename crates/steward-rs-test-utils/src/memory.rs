use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use steward_rs_protocol::{ActivityError, MemoryStore, OwnerId};

/// Memory double recording every saved outcome.
#[derive(Clone, Default)]
pub struct RecordingMemory {
    saved: Arc<Mutex<Vec<(OwnerId, String, String)>>>,
}

impl RecordingMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> Vec<(OwnerId, String, String)> {
        self.saved.lock().clone()
    }
}

#[async_trait]
impl MemoryStore for RecordingMemory {
    async fn save_outcome(
        &self,
        owner_id: &OwnerId,
        goal: &str,
        outcome: &str,
    ) -> Result<(), ActivityError> {
        self.saved
            .lock()
            .push((owner_id.clone(), goal.to_string(), outcome.to_string()));
        Ok(())
    }
}

use async_trait::async_trait;
use steward_rs_protocol::{ActivityError, OwnerId, PlanDecision, Planner};

#[derive(Debug, Clone)]
pub struct FixedPlanner {
    classification: String,
    reasoning: String,
}

impl FixedPlanner {
    pub fn new(classification: impl Into<String>, reasoning: impl Into<String>) -> Self {
        Self {
            classification: classification.into(),
            reasoning: reasoning.into(),
        }
    }

    pub fn browser() -> Self {
        Self::new("browser", "needs a live session")
    }

    pub fn memory(reasoning: impl Into<String>) -> Self {
        Self::new("memory", reasoning)
    }

    pub fn clarify(reasoning: impl Into<String>) -> Self {
        Self::new("clarify", reasoning)
    }
}

#[async_trait]
impl Planner for FixedPlanner {
    async fn plan_strategy(
        &self,
        _owner_id: &OwnerId,
        _goal: &str,
    ) -> Result<PlanDecision, ActivityError> {
        Ok(PlanDecision {
            classification: self.classification.clone(),
            reasoning: self.reasoning.clone(),
            profile_context: serde_json::json!({ "profile": "test" }),
        })
    }
}

/// Planner that always fails with the configured classification of error.
#[derive(Debug, Clone)]
pub struct FailingPlanner {
    transient: bool,
}

impl FailingPlanner {
    pub fn transient() -> Self {
        Self { transient: true }
    }

    pub fn terminal() -> Self {
        Self { transient: false }
    }
}

#[async_trait]
impl Planner for FailingPlanner {
    async fn plan_strategy(
        &self,
        _owner_id: &OwnerId,
        _goal: &str,
    ) -> Result<PlanDecision, ActivityError> {
        if self.transient {
            Err(ActivityError::transient("planner unreachable"))
        } else {
            Err(ActivityError::terminal("planner misconfigured"))
        }
    }
}

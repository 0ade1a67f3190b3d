//! Configuration schema for Steward.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root config for the Steward orchestration core.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StewardConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    #[serde(default)]
    pub journal: JournalConfig,
}

impl StewardConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> StewardConfigBuilder {
        StewardConfigBuilder::new()
    }
}

/// Builder for assembling a `StewardConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct StewardConfigBuilder {
    config: StewardConfig,
}

impl StewardConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: StewardConfig::default(),
        }
    }

    /// Replace the orchestrator configuration.
    pub fn orchestrator(mut self, orchestrator: OrchestratorConfig) -> Self {
        self.config.orchestrator = orchestrator;
        self
    }

    /// Replace the activity retry configuration.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    /// Replace the per-activity-class timeout configuration.
    pub fn timeouts(mut self, timeouts: TimeoutsConfig) -> Self {
        self.config.timeouts = timeouts;
        self
    }

    /// Replace the journal configuration.
    pub fn journal(mut self, journal: JournalConfig) -> Self {
        self.config.journal = journal;
        self
    }

    /// Finalize and return the built `StewardConfig`.
    pub fn build(self) -> StewardConfig {
        self.config
    }
}

/// Orchestrator-level policy knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Hard ceiling on browser turns per job.
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    /// Bounded wait on a human approval decision, in seconds.
    #[serde(default = "default_approval_deadline_secs")]
    pub approval_deadline_secs: u64,
    /// Whether to notify the owner when a job starts.
    #[serde(default = "default_send_started_notice")]
    pub send_started_notice: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            approval_deadline_secs: default_approval_deadline_secs(),
            send_started_notice: default_send_started_notice(),
        }
    }
}

impl OrchestratorConfig {
    /// Approval deadline as a `Duration`.
    pub fn approval_deadline(&self) -> Duration {
        Duration::from_secs(self.approval_deadline_secs)
    }
}

/// Default browser-turn ceiling per job.
fn default_max_turns() -> u32 {
    20
}

/// Default approval wait: 24 hours.
fn default_approval_deadline_secs() -> u64 {
    24 * 60 * 60
}

/// Default toggle for the task-started notice.
fn default_send_started_notice() -> bool {
    true
}

/// Retry policy applied by the activity invoker to transient failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum attempts per activity, including the initial one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay for exponential backoff, in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Cap for the exponential backoff delay, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryConfig {
    /// Base backoff delay as a `Duration`.
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Backoff delay cap as a `Duration`.
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms.max(self.base_delay_ms))
    }
}

/// Default attempt ceiling per activity.
fn default_max_attempts() -> u32 {
    3
}

/// Default base backoff delay in milliseconds.
fn default_base_delay_ms() -> u64 {
    200
}

/// Default backoff delay cap in milliseconds.
fn default_max_delay_ms() -> u64 {
    5_000
}

/// Per-activity-class timeouts, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    /// Job record creation and status updates.
    #[serde(default = "default_job_store_secs")]
    pub job_store_secs: u64,
    /// Strategy planning.
    #[serde(default = "default_planning_secs")]
    pub planning_secs: u64,
    /// Remote session provisioning.
    #[serde(default = "default_provision_secs")]
    pub provision_secs: u64,
    /// One browser turn.
    #[serde(default = "default_turn_secs")]
    pub turn_secs: u64,
    /// Outbound owner notifications.
    #[serde(default = "default_notify_secs")]
    pub notify_secs: u64,
    /// Long-term memory writes.
    #[serde(default = "default_memory_secs")]
    pub memory_secs: u64,
    /// Remote session release.
    #[serde(default = "default_release_secs")]
    pub release_secs: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            job_store_secs: default_job_store_secs(),
            planning_secs: default_planning_secs(),
            provision_secs: default_provision_secs(),
            turn_secs: default_turn_secs(),
            notify_secs: default_notify_secs(),
            memory_secs: default_memory_secs(),
            release_secs: default_release_secs(),
        }
    }
}

impl TimeoutsConfig {
    /// Job store timeout as a `Duration`.
    pub fn job_store(&self) -> Duration {
        Duration::from_secs(self.job_store_secs)
    }

    /// Planning timeout as a `Duration`.
    pub fn planning(&self) -> Duration {
        Duration::from_secs(self.planning_secs)
    }

    /// Session provisioning timeout as a `Duration`.
    pub fn provision(&self) -> Duration {
        Duration::from_secs(self.provision_secs)
    }

    /// Turn timeout as a `Duration`.
    pub fn turn(&self) -> Duration {
        Duration::from_secs(self.turn_secs)
    }

    /// Notification timeout as a `Duration`.
    pub fn notify(&self) -> Duration {
        Duration::from_secs(self.notify_secs)
    }

    /// Memory write timeout as a `Duration`.
    pub fn memory(&self) -> Duration {
        Duration::from_secs(self.memory_secs)
    }

    /// Session release timeout as a `Duration`.
    pub fn release(&self) -> Duration {
        Duration::from_secs(self.release_secs)
    }
}

fn default_job_store_secs() -> u64 {
    30
}

fn default_planning_secs() -> u64 {
    120
}

fn default_provision_secs() -> u64 {
    180
}

fn default_turn_secs() -> u64 {
    300
}

fn default_notify_secs() -> u64 {
    60
}

fn default_memory_secs() -> u64 {
    30
}

fn default_release_secs() -> u64 {
    30
}

/// Journal persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct JournalConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub path: Option<String>,
}

//! Durable-execution journal backed by JSONL files.
//!
//! Each job owns one append-only journal of the nondeterministic
//! observations its execution made: completed activities, signal
//! observations, gate open/resolve records, and the terminal outcome.
//! Replaying the journal through the same orchestration code reproduces the
//! execution up to the crash point without re-invoking any completed
//! activity, which is what gives activities their exactly-once semantics.

use chrono::{DateTime, Utc};
use directories::BaseDirs;
use log::{debug, info};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use steward_rs_protocol::{GateOutcome, JobId, JobStatus, OwnerId};
use thiserror::Error;

/// Journal schema version written as the first line of every file.
const SCHEMA_VERSION: u32 = 1;

/// One recorded observation in a job's execution history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JournalEvent {
    SchemaVersion {
        version: u32,
    },
    /// Inputs the job was started with; always the first event.
    JobStarted {
        job_id: JobId,
        goal: String,
        owner_id: OwnerId,
        notify_address: String,
        started_at: DateTime<Utc>,
    },
    /// A collaborator call completed; `result` is its serialized value.
    ActivityCompleted {
        name: String,
        result: Value,
    },
    /// A kill check returned true at this point in the execution.
    KillObserved,
    /// Queued owner messages were merged into the working goal here.
    MessagesDrained {
        messages: Vec<String>,
    },
    /// An approval gate opened; the deadline derives from `opened_at`.
    GateOpened {
        action: String,
        opened_at: DateTime<Utc>,
    },
    /// The matching gate wait resolved.
    GateResolved {
        outcome: GateOutcome,
    },
    /// The job reached a terminal status; always the last event.
    JobFinished {
        status: JobStatus,
        summary: String,
    },
}

/// Errors returned by journal stores.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("unsupported schema version: {0}")]
    UnsupportedSchema(u32),
}

/// Persistent store abstraction for job journals.
pub trait JournalStore: Send + Sync {
    /// Append one event to a job's journal, creating it on first write.
    fn append(&self, job_id: JobId, event: &JournalEvent) -> Result<(), JournalError>;
    /// Load a job's recorded events, header stripped; `None` if absent.
    fn load(&self, job_id: JobId) -> Result<Option<Vec<JournalEvent>>, JournalError>;
}

/// JSONL-backed journal store, one file per job.
pub struct JsonlJournalStore {
    /// Root directory for journal files.
    root: PathBuf,
    /// Serialize write access to journal files.
    write_lock: Mutex<()>,
}

impl JsonlJournalStore {
    /// Create a new JSONL journal store under the given root.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, JournalError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        info!("initialized JSONL journal store (root={})", root.display());
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    /// Build the journal file path for a job.
    fn journal_path(&self, job_id: JobId) -> PathBuf {
        self.root.join(format!("{job_id}.jsonl"))
    }
}

impl JournalStore for JsonlJournalStore {
    fn append(&self, job_id: JobId, event: &JournalEvent) -> Result<(), JournalError> {
        let _guard = self.write_lock.lock();
        let path = self.journal_path(job_id);
        let fresh = !path.exists();
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        if fresh {
            let header = serde_json::to_string(&JournalEvent::SchemaVersion {
                version: SCHEMA_VERSION,
            })?;
            writeln!(file, "{header}")?;
        }
        let line = serde_json::to_string(event)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    fn load(&self, job_id: JobId) -> Result<Option<Vec<JournalEvent>>, JournalError> {
        let path = self.journal_path(job_id);
        if !path.exists() {
            return Ok(None);
        }
        let file = OpenOptions::new().read(true).open(&path)?;
        let reader = BufReader::new(file);
        let mut events = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line)? {
                JournalEvent::SchemaVersion { version } => {
                    if version > SCHEMA_VERSION {
                        return Err(JournalError::UnsupportedSchema(version));
                    }
                }
                event => events.push(event),
            }
        }
        debug!(
            "loaded journal (job_id={}, events={})",
            job_id,
            events.len()
        );
        Ok(Some(events))
    }
}

/// Resolve the journal root: explicit path, else `~/.steward/journal`.
pub fn resolve_journal_root(path: Option<&String>) -> Result<PathBuf, JournalError> {
    let cwd = std::env::current_dir()?;
    if let Some(path) = path {
        let path = PathBuf::from(path);
        if path.is_absolute() {
            return Ok(path);
        }
        return Ok(cwd.join(path));
    }

    if let Some(home) = BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf()) {
        return Ok(home.join(".steward").join("journal"));
    }

    Ok(cwd.join(".steward").join("journal"))
}

use serde::{Deserialize, Serialize};

use crate::analysis::Analysis;

/// Job identifiers start at 1 and increase by one per accepted submission.
pub type JobId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Done,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Running => write!(f, "running"),
            JobStatus::Done => write!(f, "done"),
        }
    }
}

/// How a finished job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The result was persisted to the result store
    Stored,
    /// The job failed; the reason is reported to pollers instead of data
    Failed(String),
}

/// Work item carried by the job queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedJob {
    pub id: JobId,
    pub analysis: Analysis,
}

impl QueuedJob {
    pub fn new(id: JobId, analysis: Analysis) -> Self {
        Self { id, analysis }
    }
}

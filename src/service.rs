//! Core-facing job API: submit, poll, list, count and shut down.
//!
//! Every call returns immediately. Submission only allocates an id and queues
//! the job; execution happens on the worker pool.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::analysis::{Analysis, AnalysisKind, ParameterError, Parameters};
use crate::scheduler::{JobId, JobOutcome, JobQueue, JobRegistry, JobStatus, QueuedJob};
use crate::shutdown::{DrainStatus, ShutdownSignal};
use crate::store::ResultStore;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("shutting down")]
    ShuttingDown,

    #[error("invalid parameters: {0}")]
    InvalidParameters(#[from] ParameterError),
}

/// Answer to a poll for one job.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PollResponse {
    Running,
    Done { data: Value },
    Error { reason: String },
}

#[derive(Debug, Clone)]
pub struct JobService {
    registry: Arc<JobRegistry>,
    queue: Arc<JobQueue>,
    store: ResultStore,
    shutdown: ShutdownSignal,
}

impl JobService {
    pub fn new(
        registry: Arc<JobRegistry>,
        queue: Arc<JobQueue>,
        store: ResultStore,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            registry,
            queue,
            store,
            shutdown,
        }
    }

    /// Validate and queue a job. Rejected requests never receive an id.
    pub fn submit(&self, kind: AnalysisKind, params: Parameters) -> Result<JobId, SubmitError> {
        if self.shutdown.is_signalled() {
            tracing::warn!(kind = %kind, "Rejecting submission, shutting down");
            return Err(SubmitError::ShuttingDown);
        }

        let analysis = Analysis::from_request(kind, params).map_err(|e| {
            tracing::warn!(kind = %kind, error = %e, "Rejecting submission");
            SubmitError::from(e)
        })?;

        let job = self
            .queue
            .enqueue_with(|| {
                let id = self.registry.allocate(analysis.clone());
                QueuedJob::new(id, analysis)
            })
            .map_err(|_| {
                tracing::warn!(kind = %kind, "Rejecting submission, shutting down");
                SubmitError::ShuttingDown
            })?;

        tracing::info!(job_id = job.id, kind = %kind, "Job submitted");
        Ok(job.id)
    }

    pub fn poll(&self, id: JobId) -> PollResponse {
        let Some(record) = self.registry.get(id) else {
            return PollResponse::Error {
                reason: "Invalid job_id".to_string(),
            };
        };

        match (record.status, record.outcome) {
            (JobStatus::Running, _) => PollResponse::Running,
            (JobStatus::Done, Some(JobOutcome::Stored)) => match self.store.load(id) {
                Ok(data) => PollResponse::Done { data },
                Err(e) => {
                    tracing::error!(job_id = id, error = %e, "Failed to load stored result");
                    PollResponse::Error {
                        reason: e.to_string(),
                    }
                }
            },
            (JobStatus::Done, Some(JobOutcome::Failed(reason))) => PollResponse::Error { reason },
            (JobStatus::Done, None) => {
                tracing::error!(job_id = id, "Job is done without an outcome");
                PollResponse::Error {
                    reason: "unrecognized job state".to_string(),
                }
            }
        }
    }

    pub fn list_jobs(&self) -> BTreeMap<JobId, JobStatus> {
        self.registry.statuses()
    }

    /// Submitted jobs not yet done.
    pub fn outstanding_count(&self) -> u64 {
        self.registry.outstanding()
    }

    /// Raise the shutdown flag and report whether queued work remains.
    pub fn signal_shutdown(&self) -> DrainStatus {
        self.shutdown.signal();
        self.shutdown.drain_status()
    }

    #[cfg(test)]
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_signalled()
    }

    pub fn shutdown(&self) -> &ShutdownSignal {
        &self.shutdown
    }
}

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::analysis::AnalysisError;
use crate::dataset::Dataset;
use crate::error::TallyError;
use crate::scheduler::{JobId, JobOutcome, QueuedJob};
use crate::store::ResultStore;

/// Result of job execution
#[derive(Debug)]
pub struct ExecutionResult {
    pub job_id: JobId,
    pub outcome: JobOutcome,
    pub elapsed: Duration,
}

#[derive(Debug, thiserror::Error)]
enum JobFailure {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error("failed to store result: {0}")]
    Store(#[from] TallyError),
}

/// Runs one job against the dataset and persists its result.
///
/// Every failure, including a panic inside an analysis, is turned into a
/// [`JobOutcome::Failed`] so the calling worker keeps running.
#[derive(Debug, Clone)]
pub struct JobExecutor {
    dataset: Arc<Dataset>,
    store: ResultStore,
}

impl JobExecutor {
    pub fn new(dataset: Arc<Dataset>, store: ResultStore) -> Self {
        Self { dataset, store }
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    pub fn execute(&self, job: &QueuedJob) -> ExecutionResult {
        let started = Instant::now();
        tracing::debug!(job_id = job.id, kind = %job.analysis.kind(), question = job.analysis.question(), "Executing job");

        let outcome = match catch_unwind(AssertUnwindSafe(|| self.run(job))) {
            Ok(Ok(())) => JobOutcome::Stored,
            Ok(Err(e)) => {
                tracing::error!(job_id = job.id, kind = %job.analysis.kind(), error = %e, "Job failed");
                JobOutcome::Failed(e.to_string())
            }
            Err(_) => {
                tracing::error!(job_id = job.id, kind = %job.analysis.kind(), "Job panicked");
                JobOutcome::Failed("internal error while executing job".to_string())
            }
        };

        ExecutionResult {
            job_id: job.id,
            outcome,
            elapsed: started.elapsed(),
        }
    }

    fn run(&self, job: &QueuedJob) -> Result<(), JobFailure> {
        let value = job.analysis.run(&self.dataset)?;
        self.store.persist(job.id, &value)?;
        Ok(())
    }
}

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use thiserror::Error;

use crate::analysis::Analysis;
use crate::scheduler::job::{JobId, JobOutcome, JobStatus};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown job id {0}")]
    UnknownJob(JobId),

    #[error("job {0} is already done")]
    AlreadyDone(JobId),
}

/// Snapshot of one registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub id: JobId,
    pub analysis: Analysis,
    pub status: JobStatus,
    pub outcome: Option<JobOutcome>,
    pub submitted_at: Instant,
    pub finished_at: Option<Instant>,
}

#[derive(Debug, Default)]
struct RegistryState {
    last_id: JobId,
    jobs: HashMap<JobId, JobRecord>,
}

/// Every job ever accepted, keyed by id.
///
/// Mutations take a single lock for one entry at a time. The done counter is a
/// separate atomic so status polling never contends with workers.
#[derive(Debug, Default)]
pub struct JobRegistry {
    state: Mutex<RegistryState>,
    done: AtomicU64,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the next id and record the job as running. The entry is visible
    /// to readers before the id is returned.
    pub fn allocate(&self, analysis: Analysis) -> JobId {
        let mut state = self.state.lock();
        state.last_id += 1;
        let id = state.last_id;
        state.jobs.insert(
            id,
            JobRecord {
                id,
                analysis,
                status: JobStatus::Running,
                outcome: None,
                submitted_at: Instant::now(),
                finished_at: None,
            },
        );
        id
    }

    pub fn get_status(&self, id: JobId) -> Option<JobStatus> {
        self.state.lock().jobs.get(&id).map(|job| job.status)
    }

    pub fn get(&self, id: JobId) -> Option<JobRecord> {
        self.state.lock().jobs.get(&id).cloned()
    }

    /// Move a running job to done. Each job makes this transition exactly once.
    pub fn mark_done(&self, id: JobId, outcome: JobOutcome) -> Result<(), RegistryError> {
        let mut state = self.state.lock();
        let job = state
            .jobs
            .get_mut(&id)
            .ok_or(RegistryError::UnknownJob(id))?;

        if job.status == JobStatus::Done {
            return Err(RegistryError::AlreadyDone(id));
        }

        job.status = JobStatus::Done;
        job.outcome = Some(outcome);
        job.finished_at = Some(Instant::now());
        self.done.fetch_add(1, Ordering::Release);
        Ok(())
    }

    pub fn count_done(&self) -> u64 {
        self.done.load(Ordering::Acquire)
    }

    pub fn count_total(&self) -> u64 {
        self.state.lock().last_id
    }

    /// Jobs not yet done.
    pub fn outstanding(&self) -> u64 {
        let total = self.count_total();
        total.saturating_sub(self.count_done())
    }

    /// Status of every job, ordered by id.
    pub fn statuses(&self) -> BTreeMap<JobId, JobStatus> {
        self.state
            .lock()
            .jobs
            .iter()
            .map(|(id, job)| (*id, job.status))
            .collect()
    }
}

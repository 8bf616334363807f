use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::config::PoolConfig;
use crate::error::{Result, TallyError};
use crate::scheduler::{Dequeued, JobQueue, JobRegistry};
use crate::worker::executor::JobExecutor;

/// Everything a worker needs, shared by all workers.
#[derive(Debug, Clone)]
pub struct WorkerContext {
    pub queue: Arc<JobQueue>,
    pub registry: Arc<JobRegistry>,
    pub executor: JobExecutor,
}

/// Fixed set of long-lived worker threads draining the job queue.
///
/// Workers are created once in [`WorkerPool::start`] and reused for every job.
/// A worker exits only after the queue has been closed and it finds no job
/// left to take.
#[derive(Debug)]
pub struct WorkerPool {
    handles: Vec<JoinHandle<usize>>,
}

impl WorkerPool {
    pub fn start(config: &PoolConfig, context: WorkerContext) -> Result<Self> {
        Self::start_with(config, context, |index, context, idle_poll| {
            std::thread::Builder::new()
                .name(format!("tally-worker-{}", index))
                .spawn(move || worker_loop(index, context, idle_poll))
        })
    }

    /// Spawn every worker through `spawn`. If any spawn fails the queue is
    /// closed and the workers already running are joined before returning.
    fn start_with<F>(config: &PoolConfig, context: WorkerContext, mut spawn: F) -> Result<Self>
    where
        F: FnMut(usize, WorkerContext, Duration) -> std::io::Result<JoinHandle<usize>>,
    {
        let workers = config.workers.max(1);
        let mut handles = Vec::with_capacity(workers);

        for index in 0..workers {
            match spawn(index, context.clone(), config.idle_poll) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    tracing::error!(worker = index, error = %e, "Failed to spawn worker, stopping pool");
                    context.queue.close();
                    Self { handles }.join();
                    return Err(TallyError::Spawn(e.to_string()));
                }
            }
        }

        tracing::info!(workers, "Worker pool started");
        Ok(Self { handles })
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Wait for every worker to exit. Returns how many jobs each worker ran.
    ///
    /// Only returns once the queue has been closed and drained.
    pub fn join(self) -> Vec<usize> {
        self.handles
            .into_iter()
            .enumerate()
            .map(|(index, handle)| match handle.join() {
                Ok(executed) => executed,
                Err(_) => {
                    tracing::error!(worker = index, "Worker thread panicked");
                    0
                }
            })
            .collect()
    }
}

/// Worker loop: take a job, run it, record it as done; exit once the queue is
/// closed and empty.
fn worker_loop(index: usize, context: WorkerContext, idle_poll: Duration) -> usize {
    tracing::debug!(worker = index, "Worker started");
    let mut executed = 0usize;

    loop {
        let job = match context.queue.dequeue_timeout(idle_poll) {
            Dequeued::Job(job) => job,
            Dequeued::Idle => continue,
            Dequeued::Drained => break,
        };

        let result = context.executor.execute(&job);
        executed += 1;

        match context.registry.mark_done(result.job_id, result.outcome) {
            Ok(()) => tracing::info!(
                worker = index,
                job_id = result.job_id,
                elapsed_ms = result.elapsed.as_millis() as u64,
                "Job finished"
            ),
            Err(e) => tracing::error!(
                worker = index,
                job_id = result.job_id,
                error = %e,
                "Registry rejected job completion"
            ),
        }
    }

    tracing::info!(worker = index, executed, "Worker stopped");
    executed
}

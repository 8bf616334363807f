use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

use crate::scheduler::job::QueuedJob;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("job queue is closed")]
pub struct QueueClosed;

/// What a worker got back from [`JobQueue::dequeue_timeout`].
#[derive(Debug, PartialEq, Eq)]
pub enum Dequeued {
    Job(QueuedJob),
    /// Nothing arrived within the timeout, queue still open
    Idle,
    /// Queue is closed and empty; no more work will ever arrive
    Drained,
}

#[derive(Debug, Default)]
struct QueueState {
    jobs: VecDeque<QueuedJob>,
    closed: bool,
}

/// Unbounded FIFO of pending jobs shared by submitters and workers.
///
/// Closing the queue is one-way: later enqueues are refused, while jobs already
/// queued stay available until a worker takes them.
#[derive(Debug, Default)]
pub struct JobQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and enqueue a job while holding the queue lock, so the closed
    /// check and the push cannot be split by a concurrent [`close`](Self::close).
    /// `make` is not called when the queue is closed.
    pub fn enqueue_with<F>(&self, make: F) -> Result<QueuedJob, QueueClosed>
    where
        F: FnOnce() -> QueuedJob,
    {
        let mut state = self.state.lock();
        if state.closed {
            return Err(QueueClosed);
        }
        let job = make();
        state.jobs.push_back(job.clone());
        drop(state);

        self.available.notify_one();
        Ok(job)
    }

    #[cfg(test)]
    pub fn enqueue(&self, job: QueuedJob) -> Result<(), QueueClosed> {
        self.enqueue_with(|| job).map(|_| ())
    }

    /// Pop the oldest job without waiting.
    #[cfg(test)]
    pub fn try_dequeue(&self) -> Option<QueuedJob> {
        self.state.lock().jobs.pop_front()
    }

    /// Pop the oldest job, waiting up to `timeout` for one to arrive.
    pub fn dequeue_timeout(&self, timeout: Duration) -> Dequeued {
        let mut state = self.state.lock();

        if state.jobs.is_empty() && !state.closed {
            // Spurious wakeups fall through to Idle; the caller loops.
            let _ = self.available.wait_for(&mut state, timeout);
        }

        match state.jobs.pop_front() {
            Some(job) => Dequeued::Job(job),
            None if state.closed => Dequeued::Drained,
            None => Dequeued::Idle,
        }
    }

    /// Refuse further enqueues and wake every idle worker. Returns `true` only
    /// for the call that actually closed the queue.
    pub fn close(&self) -> bool {
        let mut state = self.state.lock();
        let first = !state.closed;
        state.closed = true;
        drop(state);

        self.available.notify_all();
        first
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn len(&self) -> usize {
        self.state.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().jobs.is_empty()
    }
}

//! Worker execution engine for running jobs.
//!
//! - **Pool**: a fixed number of OS threads, started once, pulling from the
//!   shared [`JobQueue`](crate::scheduler::JobQueue)
//! - **Execution**: runs the job's analysis, persists the result, and converts
//!   every failure into a terminal outcome
//!
//! # Execution Flow
//!
//! 1. A worker takes the oldest job, or waits on the queue's condition variable
//! 2. [`JobExecutor::execute`] computes and stores the result
//! 3. The worker marks the job done in the [`JobRegistry`](crate::scheduler::JobRegistry)
//! 4. After the queue is closed, each worker exits on its first empty dequeue

pub mod executor;
pub mod pool;

pub use executor::{ExecutionResult, JobExecutor};
pub use pool::{WorkerContext, WorkerPool};

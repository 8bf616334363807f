pub mod job;
pub mod queue;
pub mod registry;

pub use job::{JobId, JobOutcome, JobStatus, QueuedJob};
pub use queue::{Dequeued, JobQueue, QueueClosed};
pub use registry::{JobRecord, JobRegistry, RegistryError};

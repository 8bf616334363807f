use std::sync::Arc;

use serde::Serialize;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

use crate::scheduler::JobQueue;

/// Progress of a graceful shutdown, as reported to the caller that requested it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DrainStatus {
    /// Queued jobs are still waiting for a worker
    Running,
    /// The queue is empty; no more work is pending
    Done,
}

/// One-way graceful shutdown flag.
///
/// Signalling closes the job queue, which is the flag both submitters and
/// workers observe under the queue lock, and cancels a token that async
/// subsystems (the HTTP server) can await.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    queue: Arc<JobQueue>,
    token: CancellationToken,
}

impl ShutdownSignal {
    pub fn new(queue: Arc<JobQueue>) -> Self {
        Self {
            queue,
            token: CancellationToken::new(),
        }
    }

    /// Set the flag. Idempotent; returns `true` only on the first call.
    pub fn signal(&self) -> bool {
        let first = self.queue.close();
        self.token.cancel();
        if first {
            tracing::info!(queued = self.queue.len(), "Graceful shutdown requested, draining queue");
        }
        first
    }

    pub fn is_signalled(&self) -> bool {
        self.queue.is_closed()
    }

    pub fn drain_status(&self) -> DrainStatus {
        if self.queue.is_empty() {
            DrainStatus::Done
        } else {
            DrainStatus::Running
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

/// Install a handler that triggers graceful shutdown on SIGTERM or SIGINT.
///
/// Must be called from within a Tokio runtime.
pub fn install_shutdown_handler(shutdown: ShutdownSignal) -> std::io::Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, initiating graceful shutdown");
            }
            _ = shutdown.token.cancelled() => return,
        }

        shutdown.signal();
    });

    Ok(())
}

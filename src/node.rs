use std::sync::Arc;

use tokio::sync::oneshot;

use crate::api;
use crate::config::ServerConfig;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::scheduler::{JobQueue, JobRegistry};
use crate::service::JobService;
use crate::shutdown::ShutdownSignal;
use crate::store::ResultStore;
use crate::worker::{JobExecutor, WorkerContext, WorkerPool};

/// Main node that wires the registry, queue, worker pool and HTTP API together.
pub struct Node {
    pub config: ServerConfig,
    service: JobService,
    pool: WorkerPool,
}

impl Node {
    /// Open the result store and start the worker pool.
    ///
    /// Workers begin pulling jobs immediately; nothing is served over HTTP
    /// until [`Node::run`] is called.
    pub fn start(config: ServerConfig, dataset: Arc<Dataset>) -> Result<Self> {
        let store = ResultStore::open(&config.results_dir)?;
        let registry = Arc::new(JobRegistry::new());
        let queue = Arc::new(JobQueue::new());
        let shutdown = ShutdownSignal::new(queue.clone());

        let pool = WorkerPool::start(
            &config.pool,
            WorkerContext {
                queue: queue.clone(),
                registry: registry.clone(),
                executor: JobExecutor::new(dataset, store.clone()),
            },
        )?;

        let service = JobService::new(registry, queue, store, shutdown);

        Ok(Self {
            config,
            service,
            pool,
        })
    }

    pub fn service(&self) -> &JobService {
        &self.service
    }

    pub fn pool_size(&self) -> usize {
        self.pool.size()
    }

    /// Signal shutdown and block until every worker has drained the queue and
    /// exited. Returns the number of jobs each worker executed.
    pub fn shutdown_and_join(self) -> Vec<usize> {
        self.service.signal_shutdown();
        self.pool.join()
    }

    /// Serve the HTTP API until a graceful shutdown has been requested and the
    /// worker pool has drained, then keep answering polls for the configured
    /// linger period before returning.
    pub async fn run(self) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let Node {
            config,
            service,
            pool,
        } = self;

        let token = service.shutdown().token();
        let linger = config.shutdown_linger;
        let (drained_tx, drained_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            token.cancelled().await;
            match tokio::task::spawn_blocking(move || pool.join()).await {
                Ok(executed) => {
                    tracing::info!(executed = ?executed, "Worker pool drained");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to join worker pool");
                }
            }
            tokio::time::sleep(linger).await;
            let _ = drained_tx.send(());
        });

        api::serve(config.listen_addr, service, async move {
            let _ = drained_rx.await;
        })
        .await?;

        tracing::info!("Server stopped");
        Ok(())
    }
}

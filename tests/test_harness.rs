//! Shared fixtures for integration tests: small datasets and polling helpers.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tally_lite::analysis::questions::{QUESTIONS_BEST_IS_MAX, QUESTIONS_BEST_IS_MIN};
use tally_lite::config::{PoolConfig, ServerConfig};
use tally_lite::dataset::{Dataset, Row};
use tally_lite::node::Node;
use tally_lite::scheduler::{JobId, JobQueue, JobRegistry};
use tally_lite::service::{JobService, PollResponse};
use tally_lite::shutdown::ShutdownSignal;
use tally_lite::store::ResultStore;
use tally_lite::worker::{JobExecutor, WorkerContext};
use tempfile::TempDir;

pub const IDLE_POLL: Duration = Duration::from_millis(10);

/// Question "Q1" with one row per state A(10), B(20), C(30), a ranked
/// best-is-min and best-is-max question over seven states, and stratified rows.
pub fn sample_dataset() -> Dataset {
    let mut rows = vec![
        Row::new("Q1", "A", 10.0),
        Row::new("Q1", "B", 20.0),
        Row::new("Q1", "C", 30.0),
    ];

    for (i, state) in ["S1", "S2", "S3", "S4", "S5", "S6", "S7"].iter().enumerate() {
        rows.push(Row::new(QUESTIONS_BEST_IS_MIN[0], *state, (i + 1) as f64));
        rows.push(Row::new(QUESTIONS_BEST_IS_MAX[0], *state, (i + 1) as f64 * 10.0));
    }

    rows.push(Row::new("Q2", "Ohio", 12.0).with_stratification("Age (years)", "18 - 24"));
    rows.push(Row::new("Q2", "Ohio", 20.0).with_stratification("Gender", "Female"));
    rows.push(Row::new("Q2", "Iowa", 8.0).with_stratification("Gender", "Female"));

    Dataset::from_rows(rows)
}

pub fn test_server_config(dir: &Path, workers: usize) -> ServerConfig {
    ServerConfig::default()
        .with_results_dir(dir.join("results"))
        .with_pool(PoolConfig::new(workers).with_idle_poll(IDLE_POLL))
        .with_shutdown_linger(Duration::ZERO)
}

/// Start a node with its worker pool over `dataset`.
pub fn start_node(workers: usize, dataset: Dataset) -> (Node, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let node = Node::start(test_server_config(dir.path(), workers), Arc::new(dataset)).unwrap();
    (node, dir)
}

/// Service and worker context wired together without any running worker, so
/// tests control when execution begins.
pub struct Parts {
    pub service: JobService,
    pub context: WorkerContext,
    pub registry: Arc<JobRegistry>,
    pub queue: Arc<JobQueue>,
    _dir: TempDir,
}

pub fn parts(dataset: Dataset) -> Parts {
    let dir = tempfile::tempdir().unwrap();
    let store = ResultStore::open(dir.path().join("results")).unwrap();
    let registry = Arc::new(JobRegistry::new());
    let queue = Arc::new(JobQueue::new());
    let shutdown = ShutdownSignal::new(queue.clone());

    let context = WorkerContext {
        queue: queue.clone(),
        registry: registry.clone(),
        executor: JobExecutor::new(Arc::new(dataset), store.clone()),
    };
    let service = JobService::new(registry.clone(), queue.clone(), store, shutdown);

    Parts {
        service,
        context,
        registry,
        queue,
        _dir: dir,
    }
}

/// Poll until the job leaves the running state or `timeout` elapses.
pub fn wait_for_job(service: &JobService, id: JobId, timeout: Duration) -> PollResponse {
    let deadline = Instant::now() + timeout;
    loop {
        let response = service.poll(id);
        if response != PollResponse::Running || Instant::now() >= deadline {
            return response;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}

/// Poll until every submitted job is done or `timeout` elapses.
pub fn wait_for_idle(service: &JobService, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if service.outstanding_count() == 0 {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    service.outstanding_count() == 0
}

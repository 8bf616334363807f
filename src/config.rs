use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable that fixes the number of worker threads.
pub const WORKERS_ENV: &str = "TP_NUM_OF_THREADS";

const DEFAULT_IDLE_POLL_MS: u64 = 100;

/// Sizing of the worker pool.
///
/// The worker count is decided once, before the pool starts, and never changes
/// for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of long-lived worker threads
    pub workers: usize,
    /// How long an idle worker sleeps on the queue before re-checking it
    pub idle_poll: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            idle_poll: Duration::from_millis(DEFAULT_IDLE_POLL_MS),
        }
    }
}

impl PoolConfig {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            ..Default::default()
        }
    }

    /// Read the worker count from `TP_NUM_OF_THREADS`, falling back to the
    /// host's available parallelism when it is unset or not a positive integer.
    pub fn from_env() -> Self {
        Self::from_env_value(std::env::var(WORKERS_ENV).ok().as_deref())
    }

    fn from_env_value(value: Option<&str>) -> Self {
        match value.map(str::trim).map(str::parse::<usize>) {
            Some(Ok(n)) if n > 0 => Self::new(n),
            Some(_) => {
                tracing::warn!(
                    var = WORKERS_ENV,
                    value = ?value,
                    "Ignoring invalid worker count, using available parallelism"
                );
                Self::default()
            }
            None => Self::default(),
        }
    }

    pub fn with_idle_poll(mut self, idle_poll: Duration) -> Self {
        self.idle_poll = idle_poll;
        self
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub dataset_path: PathBuf,
    /// Directory receiving one `out-<id>.json` per completed job
    pub results_dir: PathBuf,
    pub pool: PoolConfig,
    /// How long polls are still answered after the pool has drained
    pub shutdown_linger: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            dataset_path: PathBuf::from("./nutrition_activity_obesity_usa_subset.csv"),
            results_dir: PathBuf::from("./results"),
            pool: PoolConfig::default(),
            shutdown_linger: Duration::from_secs(2),
        }
    }
}

impl ServerConfig {
    pub fn with_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = dir.into();
        self
    }

    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_shutdown_linger(mut self, linger: Duration) -> Self {
        self.shutdown_linger = linger;
        self
    }
}

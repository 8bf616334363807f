use thiserror::Error;

#[derive(Error, Debug)]
pub enum TallyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Result for job {0} is not available")]
    ResultMissing(u64),

    #[error("Failed to spawn worker thread: {0}")]
    Spawn(String),
}

pub type Result<T> = std::result::Result<T, TallyError>;

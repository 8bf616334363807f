use std::io::ErrorKind;
use std::path::PathBuf;

use serde_json::Value;

use crate::error::{Result, TallyError};
use crate::scheduler::JobId;

/// One JSON file per completed job under a results directory.
#[derive(Debug, Clone)]
pub struct ResultStore {
    dir: PathBuf,
}

impl ResultStore {
    /// Open the store, creating the directory if it does not exist.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    #[cfg(test)]
    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    pub fn path_for(&self, id: JobId) -> PathBuf {
        self.dir.join(format!("out-{}.json", id))
    }

    /// Write the result through a temporary sibling so readers only ever see
    /// a complete file. The sibling never outlives a failed write.
    pub fn persist(&self, id: JobId, result: &Value) -> Result<()> {
        let path = self.path_for(id);
        let tmp = self.dir.join(format!(".out-{}.json.tmp", id));
        let bytes = serde_json::to_vec(result)?;

        let written = std::fs::write(&tmp, bytes).and_then(|()| std::fs::rename(&tmp, &path));
        if let Err(e) = written {
            if let Err(cleanup) = std::fs::remove_file(&tmp) {
                if cleanup.kind() != ErrorKind::NotFound {
                    tracing::warn!(job_id = id, error = %cleanup, "Failed to remove temporary result file");
                }
            }
            return Err(e.into());
        }
        Ok(())
    }

    pub fn load(&self, id: JobId) -> Result<Value> {
        let bytes = match std::fs::read(self.path_for(id)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(TallyError::ResultMissing(id)),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }
}

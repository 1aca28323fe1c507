use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::process::Child;

use crate::error::RunnerError;

/// A child started by `run_async`. Completion is observed by polling
/// `try_status` or awaiting `wait`.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: u32,
    path: PathBuf,
    started_at: DateTime<Utc>,
    child: Child,
}

impl ProcessHandle {
    pub(crate) fn new(path: PathBuf, child: Child) -> Self {
        Self {
            pid: child.id().unwrap_or_default(),
            path,
            started_at: Utc::now(),
            child,
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Exit code if the child has finished, without blocking.
    pub fn try_status(&mut self) -> Result<Option<i32>, RunnerError> {
        self.child
            .try_wait()
            .map(|status| status.map(|s| s.code().unwrap_or(-1)))
            .map_err(|source| RunnerError::Wait {
                pid: self.pid,
                source,
            })
    }

    pub async fn wait(&mut self) -> Result<i32, RunnerError> {
        let status = self.child.wait().await.map_err(|source| RunnerError::Wait {
            pid: self.pid,
            source,
        })?;
        Ok(status.code().unwrap_or(-1))
    }

    pub async fn kill(&mut self) -> Result<(), RunnerError> {
        self.child.kill().await.map_err(|source| RunnerError::Wait {
            pid: self.pid,
            source,
        })
    }
}

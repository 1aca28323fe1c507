use async_trait::async_trait;
use std::path::Path;

use crate::error::RunnerError;

use super::handle::ProcessHandle;
use super::types::RunOutcome;

/// Launches producer/consumer targets for the coordinator.
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    fn name(&self) -> &str;

    /// Run `path` to completion. Never fails for a non-zero exit.
    async fn run_sync(&self, path: &Path) -> RunOutcome;

    /// Start `path` and return immediately; the caller polls the handle.
    async fn run_async(&self, path: &Path) -> Result<ProcessHandle, RunnerError>;
}

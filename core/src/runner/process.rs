use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::{Child, Command};

use crate::config::RunnerConfig;
use crate::error::RunnerError;
use crate::store::Store;

use super::capture::wait_with_capture;
use super::handle::ProcessHandle;
use super::traits::ProcessLauncher;
use super::types::{ExitReport, RunOutcome};

/// Environment variable through which children find the shared store.
pub const STORE_DIR_ENV: &str = "HANDOFF_STORE_DIR";

/// Launches local executables or scripts.
///
/// The child runs with its working directory set to the target's parent
/// directory. With an `interpreter` configured the target is passed to it as
/// the first argument instead of being executed directly.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    interpreter: Option<String>,
    capture_bytes: usize,
    envs: BTreeMap<String, String>,
}

impl ProcessRunner {
    pub fn new(cfg: &RunnerConfig) -> Self {
        Self {
            interpreter: cfg
                .interpreter
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            capture_bytes: cfg.capture_bytes,
            envs: cfg.env.clone(),
        }
    }

    /// Export the store location to every child.
    pub fn with_store(self, store: &Store) -> Self {
        self.with_env(STORE_DIR_ENV, store.dir().to_string_lossy())
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.insert(key.into(), value.into());
        self
    }

    fn resolve(path: &Path) -> Result<PathBuf, RunnerError> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|source| RunnerError::Launch {
                    path: path.to_path_buf(),
                    source,
                })?
                .join(path)
        };

        // An interpreter would report a missing script as a plain non-zero exit.
        if !absolute.exists() {
            return Err(RunnerError::Launch {
                path: absolute,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "target not found"),
            });
        }
        Ok(absolute)
    }

    fn command(&self, target: &Path) -> Command {
        let mut cmd = match &self.interpreter {
            Some(interpreter) => {
                let mut cmd = Command::new(interpreter);
                cmd.arg(target);
                cmd
            }
            None => Command::new(target),
        };
        if let Some(parent) = target.parent() {
            cmd.current_dir(parent);
        }
        cmd.envs(&self.envs);
        cmd
    }

    fn spawn(&self, path: &Path, capture: bool) -> Result<(PathBuf, Child), RunnerError> {
        let target = Self::resolve(path)?;
        let mut cmd = self.command(&target);
        cmd.stdin(Stdio::null());
        if capture {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        }

        let child = cmd.spawn().map_err(|source| RunnerError::Launch {
            path: target.clone(),
            source,
        })?;
        Ok((target, child))
    }
}

#[async_trait]
impl ProcessLauncher for ProcessRunner {
    fn name(&self) -> &str {
        "process"
    }

    #[tracing::instrument(name = "runner.run_sync", skip(self, path), fields(path = %path.display()))]
    async fn run_sync(&self, path: &Path) -> RunOutcome {
        let started = Instant::now();

        let (target, child) = match self.spawn(path, true) {
            Ok(spawned) => spawned,
            Err(e) => {
                tracing::warn!(error = %e, "launch failed");
                return RunOutcome::LaunchFailed {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                };
            }
        };

        match wait_with_capture(child, self.capture_bytes).await {
            Ok(captured) => {
                let report = ExitReport {
                    exit_code: captured.status.code().unwrap_or(-1),
                    stdout: captured.stdout.to_string_lossy(),
                    stderr: captured.stderr.to_string_lossy(),
                    duration_ms: started.elapsed().as_millis() as u64,
                    output_truncated: captured.stdout.truncated() || captured.stderr.truncated(),
                };
                if report.output_truncated {
                    tracing::warn!(
                        stdout_bytes = captured.stdout.total_bytes(),
                        stderr_bytes = captured.stderr.total_bytes(),
                        capture_bytes = self.capture_bytes,
                        "child output truncated to its tail"
                    );
                }
                tracing::info!(
                    exit_code = report.exit_code,
                    duration_ms = report.duration_ms,
                    "child exited"
                );
                RunOutcome::Exited(report)
            }
            Err(e) => {
                tracing::warn!(error = %e, "child could not be awaited");
                RunOutcome::LaunchFailed {
                    path: target,
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn run_async(&self, path: &Path) -> Result<ProcessHandle, RunnerError> {
        let (target, child) = self.spawn(path, false)?;
        let handle = ProcessHandle::new(target, child);
        tracing::info!(pid = handle.pid(), path = %handle.path().display(), "child started");
        Ok(handle)
    }
}

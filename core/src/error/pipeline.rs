use thiserror::Error;

use crate::coordinator::TransitionError;

/// Failures that are fatal to a pipeline run. Each one moves the coordinator
/// into `PipelinePhase::Failed` and is recorded as a `pipeline_error` event.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{stage} could not be launched: {reason}")]
    ProcessLaunch { stage: &'static str, reason: String },

    #[error("{stage} exited with code {exit_code}")]
    ProcessExecutionFailure {
        stage: &'static str,
        exit_code: i32,
        stderr: String,
    },

    #[error("required key '{key}' did not appear within {timeout_ms}ms")]
    DependencyTimeout { key: String, timeout_ms: u64 },

    #[error("wait for '{key}' cancelled by shutdown")]
    Cancelled { key: String },

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl PipelineError {
    /// Structured context stored in the `pipeline_error` event.
    pub fn context(&self) -> serde_json::Value {
        match self {
            Self::ProcessLaunch { stage, reason } => serde_json::json!({
                "stage": stage,
                "reason": reason,
            }),
            Self::ProcessExecutionFailure {
                stage,
                exit_code,
                stderr,
            } => serde_json::json!({
                "stage": stage,
                "exit_code": exit_code,
                "stderr": stderr,
            }),
            Self::DependencyTimeout { key, timeout_ms } => serde_json::json!({
                "stage": "awaiting_data",
                "key": key,
                "timeout_ms": timeout_ms,
            }),
            Self::Cancelled { key } => serde_json::json!({
                "stage": "awaiting_data",
                "key": key,
                "reason": "cancelled",
            }),
            Self::Transition(e) => serde_json::json!({
                "stage": "transition",
                "reason": e.to_string(),
            }),
        }
    }
}

use handoff_core::api::{RunnerError, StoreError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error("could not launch {path}: {reason}")]
    Launch { path: String, reason: String },

    #[error("invalid JSON value: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("pipeline failed: {0}")]
    Pipeline(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl CliError {
    // 0: success
    // 1: negative answer (missing key, timeout, unmet dependencies)
    // 2: bad input
    // 11: config error
    // 20: process launch / IO error
    // 30: store error
    // 40: pipeline failed
    // 50: internal/uncategorized
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 11,
            CliError::InvalidJson(_) => 2,
            CliError::Runner(_) | CliError::Launch { .. } | CliError::Io(_) => 20,
            CliError::Store(_) => 30,
            CliError::Pipeline(_) => 40,
            CliError::Anyhow(_) => 50,
        }
    }
}

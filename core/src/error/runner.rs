use std::path::PathBuf;

use thiserror::Error;

/// Runner-level failures. A child exiting non-zero is never one of these;
/// it is reported through `RunOutcome::Exited`.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("launch failed for {}: {source}", path.display())]
    Launch {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("wait failed for pid {pid}: {source}")]
    Wait { pid: u32, source: std::io::Error },
    #[error("stream io error: {stream} {source}")]
    StreamIo {
        stream: &'static str,
        source: std::io::Error,
    },
}

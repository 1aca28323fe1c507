//! Stable re-exports for consumers (`cli` and external crates).
//!
//! Prefer importing from `handoff_core::api` instead of reaching into internal modules.

pub use crate::config::{
    find_project_root, load, load_default, load_from_path, AppConfig, LogRotation, LoggingConfig,
    PipelineConfig, ReportRule, RunnerConfig, CONFIG_FILE_NAME,
};
pub use crate::coordinator::{
    Coordinator, EventLog, ExecutionEvent, PhaseTransition, PipelinePhase, PipelineReport,
    TransitionError, EXECUTION_LOG_KEY,
};
pub use crate::error::{PipelineError, RunnerError, StoreError};
pub use crate::runner::{
    ExitReport, ProcessHandle, ProcessLauncher, ProcessRunner, RunOutcome, STORE_DIR_ENV,
};
pub use crate::shutdown::Shutdown;
pub use crate::store::{RecordInfo, RecordMeta, Store};
pub use crate::waiter::{DependencyCheck, DependencyWaiter, WaitOutcome};

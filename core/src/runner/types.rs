use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What a child that actually ran left behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitReport {
    /// -1 when the child was terminated by a signal
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    /// Either stream exceeded `capture_bytes` and only its tail was kept
    #[serde(default)]
    pub output_truncated: bool,
}

impl ExitReport {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Result of a synchronous run. A target that could not be started is kept
/// apart from one that started and exited non-zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunOutcome {
    Exited(ExitReport),
    LaunchFailed { path: PathBuf, reason: String },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Exited(report) if report.success())
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Exited(report) => Some(report.exit_code),
            Self::LaunchFailed { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exited(code: i32) -> RunOutcome {
        RunOutcome::Exited(ExitReport {
            exit_code: code,
            stdout: String::new(),
            stderr: String::new(),
            duration_ms: 1,
            output_truncated: false,
        })
    }

    #[test]
    fn only_zero_exit_is_success() {
        assert!(exited(0).is_success());
        assert!(!exited(3).is_success());
        assert!(!RunOutcome::LaunchFailed {
            path: "x".into(),
            reason: "missing".into()
        }
        .is_success());
    }

    #[test]
    fn serializes_with_kind_tag() {
        let v = serde_json::to_value(exited(2)).unwrap();
        assert_eq!(v["kind"], "exited");
        assert_eq!(v["exit_code"], 2);
    }
}

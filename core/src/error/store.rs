use std::path::PathBuf;

use thiserror::Error;

/// 存储层错误。对外的 `Store` 操作会吸收这些错误并记录日志，
/// 只有内部的 `try_*` 路径会返回它们。
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: &'static str },

    #[error("serialization failed for {key}: {source}")]
    Serialization {
        key: String,
        source: serde_json::Error,
    },

    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("corrupt record {key}: {reason}")]
    CorruptRecord { key: String, reason: String },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

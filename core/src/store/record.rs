//! 记录键规则与元数据

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

use crate::error::StoreError;

/// 记录文件扩展名
pub const RECORD_EXTENSION: &str = "json";

const MAX_KEY_LEN: usize = 200;

/// 校验键能否直接作为文件名使用。
///
/// 规则：非空、不超过 200 字节、不以 `.` 开头（临时文件占用该前缀）、
/// 不含路径分隔符与控制字符。
pub fn validate_key(key: &str) -> Result<(), StoreError> {
    let reason = if key.is_empty() {
        Some("key is empty")
    } else if key.len() > MAX_KEY_LEN {
        Some("key longer than 200 bytes")
    } else if key.starts_with('.') {
        Some("key starts with '.'")
    } else if key.contains(['/', '\\']) {
        Some("key contains a path separator")
    } else if key.chars().any(char::is_control) {
        Some("key contains a control character")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(StoreError::InvalidKey {
            key: key.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// 记录文件的元数据，全部来自文件系统而非单独存储
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecordMeta {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// 部分文件系统不提供创建时间
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
}

impl RecordMeta {
    pub fn size_kb(&self) -> f64 {
        self.size_bytes as f64 / 1024.0
    }
}

/// `Store::info` 的结果：存在、不存在、或无法读取，三者互不混淆
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RecordInfo {
    Present(RecordMeta),
    Missing,
    Unreadable { reason: String },
}

impl RecordInfo {
    pub fn exists(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    pub fn meta(&self) -> Option<&RecordMeta> {
        match self {
            Self::Present(meta) => Some(meta),
            _ => None,
        }
    }
}

//! 执行事件日志

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::store::Store;

/// 执行日志在存储中的保留键，清理数据时不会被删除
pub const EXECUTION_LOG_KEY: &str = "execution_log";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub message: String,
    /// 总是 JSON 对象
    pub data: Value,
}

/// 只追加的事件日志，每次追加后把完整序列写回 `execution_log`
#[derive(Debug)]
pub struct EventLog {
    store: Store,
    events: Vec<ExecutionEvent>,
}

impl EventLog {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            events: Vec::new(),
        }
    }

    pub fn append(
        &mut self,
        event_type: &str,
        message: impl Into<String>,
        data: Value,
    ) -> &ExecutionEvent {
        let data = match data {
            Value::Object(_) => data,
            Value::Null => Value::Object(Map::new()),
            other => {
                let mut wrapped = Map::new();
                wrapped.insert("value".to_string(), other);
                Value::Object(wrapped)
            }
        };
        let event = ExecutionEvent {
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            message: message.into(),
            data,
        };
        tracing::info!(target: "handoff.event", event_type, "{}", event.message);

        self.events.push(event);
        if !self.store.save(EXECUTION_LOG_KEY, &self.events) {
            tracing::warn!(event_type, "execution log could not be persisted");
        }
        &self.events[self.events.len() - 1]
    }

    pub fn events(&self) -> &[ExecutionEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// 读取存储中最近一次持久化的日志
    pub fn load_persisted(store: &Store) -> Vec<ExecutionEvent> {
        store
            .load_as::<Vec<ExecutionEvent>>(EXECUTION_LOG_KEY)
            .unwrap_or_default()
    }
}

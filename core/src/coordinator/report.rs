//! 最终报告

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ReportRule;
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub pipeline_execution: ExecutionSummary,
    pub data_summary: DataSummary,
    /// 生成报告时事件日志的长度
    pub execution_events: usize,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: f64,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSummary {
    pub total_data_files: usize,
    pub data_files: Vec<String>,
}

impl PipelineReport {
    /// 基于存储当前内容构建报告（不写入）。`data_files` 不包含报告本身。
    pub fn build(
        store: &Store,
        start_time: DateTime<Utc>,
        execution_events: usize,
        rules: &[ReportRule],
    ) -> Self {
        let end_time = Utc::now();
        let duration_seconds = (end_time - start_time).num_milliseconds().max(0) as f64 / 1000.0;
        let data_files: Vec<String> = store.list().into_iter().collect();

        Self {
            pipeline_execution: ExecutionSummary {
                start_time,
                end_time,
                duration_seconds,
                status: "completed".to_string(),
            },
            data_summary: DataSummary {
                total_data_files: data_files.len(),
                data_files,
            },
            execution_events,
            recommendations: evaluate_rules(store, rules),
        }
    }
}

/// 按顺序评估规则；缺失或"空"的记录不产生任何建议
pub fn evaluate_rules(store: &Store, rules: &[ReportRule]) -> Vec<String> {
    let mut out = Vec::new();
    for rule in rules {
        match rule {
            ReportRule::Status {
                key,
                field,
                expected,
                ok_message,
                fail_message,
            } => {
                let Some(record) = store.get(key).filter(is_truthy) else {
                    continue;
                };
                let matched = record.get(field).and_then(Value::as_str) == Some(expected.as_str());
                out.push(if matched {
                    ok_message.clone()
                } else {
                    fail_message.clone()
                });
            }
            ReportRule::Present { key, message } => {
                if store.get(key).is_some_and(|v| is_truthy(&v)) {
                    out.push(message.clone());
                }
            }
        }
    }
    out
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

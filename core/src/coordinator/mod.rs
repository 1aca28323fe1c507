//! # 流水线协调
//!
//! 固定五阶段流水线：清理旧数据 → 运行生产者 → 等待关键数据 → 运行消费者 → 生成报告。
//! 任一运行阶段失败都直接进入终态 `Failed`，每次状态转换记录且仅记录一条执行事件。

mod events;
mod phase;
mod pipeline;
mod report;

pub use events::{EventLog, ExecutionEvent, EXECUTION_LOG_KEY};
pub use phase::{PhaseTransition, PipelinePhase, TransitionError};
pub use pipeline::Coordinator;
pub use report::{evaluate_rules, DataSummary, ExecutionSummary, PipelineReport};

//! 流水线阶段与转换规则

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 流水线阶段。除 `Idle` 外，每个阶段表示"该步骤已完成"。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePhase {
    Idle,
    ClearingData,
    RunningProducer,
    AwaitingData,
    RunningConsumer,
    ReportGenerated,
    Failed,
}

/// 状态转换错误
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Invalid transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: PipelinePhase,
        to: PipelinePhase,
    },
    #[error("Cannot transition from terminal state {state:?}")]
    FromTerminalState { state: PipelinePhase },
}

/// 转换表
pub struct PhaseTransition;

impl PhaseTransition {
    /// 验证状态转换是否合法
    pub fn validate(from: PipelinePhase, to: PipelinePhase) -> Result<(), TransitionError> {
        use PipelinePhase::*;

        if Self::is_terminal(from) {
            return Err(TransitionError::FromTerminalState { state: from });
        }

        let is_valid = match (from, to) {
            (Idle, ClearingData)
            | (ClearingData, RunningProducer)
            | (RunningProducer, AwaitingData)
            | (AwaitingData, RunningConsumer)
            | (RunningConsumer, ReportGenerated) => true,

            // 运行中的阶段都可以失败
            (ClearingData | RunningProducer | AwaitingData | RunningConsumer, Failed) => true,

            _ => false,
        };

        if is_valid {
            Ok(())
        } else {
            Err(TransitionError::InvalidTransition { from, to })
        }
    }

    /// 成功路径上的下一个阶段
    pub fn next_phase(current: PipelinePhase) -> Option<PipelinePhase> {
        use PipelinePhase::*;

        match current {
            Idle => Some(ClearingData),
            ClearingData => Some(RunningProducer),
            RunningProducer => Some(AwaitingData),
            AwaitingData => Some(RunningConsumer),
            RunningConsumer => Some(ReportGenerated),
            ReportGenerated | Failed => None,
        }
    }

    pub fn is_terminal(phase: PipelinePhase) -> bool {
        matches!(phase, PipelinePhase::ReportGenerated | PipelinePhase::Failed)
    }

    /// 进入 `to` 时记录的事件类型
    pub fn event_type(to: PipelinePhase) -> &'static str {
        match to {
            PipelinePhase::Idle => "pipeline_reset",
            PipelinePhase::ClearingData => "data_cleared",
            PipelinePhase::RunningProducer => "producer_completed",
            PipelinePhase::AwaitingData => "dependencies_ready",
            PipelinePhase::RunningConsumer => "consumer_completed",
            PipelinePhase::ReportGenerated => "pipeline_success",
            PipelinePhase::Failed => "pipeline_error",
        }
    }

    pub fn description(phase: PipelinePhase) -> &'static str {
        match phase {
            PipelinePhase::Idle => "idle",
            PipelinePhase::ClearingData => "stale shared data cleared",
            PipelinePhase::RunningProducer => "producer finished",
            PipelinePhase::AwaitingData => "required data available",
            PipelinePhase::RunningConsumer => "consumer finished",
            PipelinePhase::ReportGenerated => "final report generated",
            PipelinePhase::Failed => "failed",
        }
    }
}

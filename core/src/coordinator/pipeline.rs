use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::{AppConfig, PipelineConfig};
use crate::error::{PipelineError, RunnerError, StoreError};
use crate::runner::{ExitReport, ProcessHandle, ProcessLauncher, ProcessRunner, RunOutcome};
use crate::shutdown::Shutdown;
use crate::store::Store;
use crate::util::preview;
use crate::waiter::{DependencyCheck, DependencyWaiter, WaitOutcome};

use super::events::{EventLog, ExecutionEvent, EXECUTION_LOG_KEY};
use super::phase::{PhaseTransition, PipelinePhase};
use super::report::PipelineReport;

/// 事件中保留的子进程输出上限（字符）
const OUTPUT_PREVIEW_CHARS: usize = 4_000;

/// 流水线协调器。单任务驱动，事件按完成顺序追加。
pub struct Coordinator {
    store: Store,
    launcher: Arc<dyn ProcessLauncher>,
    waiter: DependencyWaiter,
    shutdown: Shutdown,
    pipeline: PipelineConfig,
    producer: PathBuf,
    consumer: PathBuf,
    log: EventLog,
    phase: PipelinePhase,
    started_at: DateTime<Utc>,
    run_id: String,
    report: Option<PipelineReport>,
}

impl Coordinator {
    pub fn new(store: Store, launcher: Arc<dyn ProcessLauncher>, cfg: &AppConfig) -> Self {
        let shutdown = Shutdown::new();
        Self {
            waiter: DependencyWaiter::new(store.clone(), shutdown.clone()),
            log: EventLog::new(store.clone()),
            store,
            launcher,
            shutdown,
            pipeline: cfg.pipeline.clone(),
            producer: cfg.producer_path(),
            consumer: cfg.consumer_path(),
            phase: PipelinePhase::Idle,
            started_at: Utc::now(),
            run_id: uuid::Uuid::new_v4().to_string(),
            report: None,
        }
    }

    /// 打开配置中的数据目录并使用 [`ProcessRunner`] 启动子进程
    pub fn from_config(cfg: &AppConfig) -> Result<Self, StoreError> {
        let store = Store::open(cfg.data_dir_path())?;
        let runner = ProcessRunner::new(&cfg.runner).with_store(&store);
        Ok(Self::new(store, Arc::new(runner), cfg))
    }

    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.waiter = DependencyWaiter::new(self.store.clone(), shutdown.clone());
        self.shutdown = shutdown;
        self
    }

    pub fn phase(&self) -> PipelinePhase {
        self.phase
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn events(&self) -> &[ExecutionEvent] {
        self.log.events()
    }

    pub fn report(&self) -> Option<&PipelineReport> {
        self.report.as_ref()
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// 回到 `Idle`，开始新一轮计时。事件日志保留。
    pub fn reset(&mut self) {
        self.phase = PipelinePhase::Idle;
        self.started_at = Utc::now();
        self.run_id = uuid::Uuid::new_v4().to_string();
        self.report = None;
    }

    /// 驱动状态机直到终态，只有到达 `ReportGenerated` 才返回 true
    #[tracing::instrument(name = "coordinator.run_pipeline", skip(self), fields(run_id = %self.run_id))]
    pub async fn run_pipeline(&mut self) -> bool {
        tracing::info!(
            launcher = self.launcher.name(),
            producer = %self.producer.display(),
            consumer = %self.consumer.display(),
            "pipeline started"
        );
        while !PhaseTransition::is_terminal(self.phase) {
            self.advance().await;
        }
        let ok = self.phase == PipelinePhase::ReportGenerated;
        if ok {
            tracing::info!("pipeline finished");
        } else {
            tracing::error!("pipeline failed");
        }
        ok
    }

    /// 执行当前阶段之后的一步，返回新阶段。终态下不做任何事。
    pub async fn advance(&mut self) -> PipelinePhase {
        match self.phase {
            PipelinePhase::Idle => {
                let cleared = self.clear_keys();
                let data = json!({
                    "cleared_count": cleared.len(),
                    "cleared_keys": cleared,
                });
                self.enter(
                    PipelinePhase::ClearingData,
                    format!("cleared {} shared records", cleared.len()),
                    data,
                );
            }
            PipelinePhase::ClearingData => {
                let path = self.producer.clone();
                match self.run_stage("producer", &path).await {
                    Ok(report) => self.enter(
                        PipelinePhase::RunningProducer,
                        format!("producer {} completed", path.display()),
                        stage_data(self.launcher.name(), &path, &report),
                    ),
                    Err(e) => self.fail(e),
                }
            }
            PipelinePhase::RunningProducer => match self.await_required().await {
                Ok(waited_ms) => {
                    let keys = self.pipeline.required_keys.clone();
                    self.enter(
                        PipelinePhase::AwaitingData,
                        format!("{} required keys available", keys.len()),
                        json!({ "keys": keys, "waited_ms": waited_ms }),
                    );
                }
                Err(e) => self.fail(e),
            },
            PipelinePhase::AwaitingData => {
                let path = self.consumer.clone();
                match self.run_stage("consumer", &path).await {
                    Ok(report) => self.enter(
                        PipelinePhase::RunningConsumer,
                        format!("consumer {} completed", path.display()),
                        stage_data(self.launcher.name(), &path, &report),
                    ),
                    Err(e) => self.fail(e),
                }
            }
            PipelinePhase::RunningConsumer => {
                let report = self.build_report();
                let saved = self.store.save(&self.pipeline.report_key, &report);
                if !saved {
                    tracing::warn!(key = %self.pipeline.report_key, "final report not persisted");
                }
                let data = json!({
                    "report_key": self.pipeline.report_key,
                    "report_saved": saved,
                    "duration_seconds": report.pipeline_execution.duration_seconds,
                });
                self.report = Some(report);
                self.enter(PipelinePhase::ReportGenerated, "pipeline completed", data);
            }
            PipelinePhase::ReportGenerated | PipelinePhase::Failed => {}
        }
        self.phase
    }

    fn enter(&mut self, to: PipelinePhase, message: impl Into<String>, data: Value) {
        if let Err(e) = PhaseTransition::validate(self.phase, to) {
            self.fail(e.into());
            return;
        }
        tracing::debug!(from = ?self.phase, to = ?to, "{}", PhaseTransition::description(to));
        self.phase = to;
        self.log.append(PhaseTransition::event_type(to), message, data);
    }

    fn fail(&mut self, err: PipelineError) {
        if let Err(e) = PhaseTransition::validate(self.phase, PipelinePhase::Failed) {
            tracing::warn!(error = %e, "forcing pipeline into failed state");
        }
        tracing::error!(phase = ?self.phase, error = %err, "pipeline step failed");
        self.phase = PipelinePhase::Failed;
        self.report = None;
        self.log.append(
            PhaseTransition::event_type(PipelinePhase::Failed),
            err.to_string(),
            err.context(),
        );
    }

    async fn run_stage(&self, stage: &'static str, path: &Path) -> Result<ExitReport, PipelineError> {
        match self.launcher.run_sync(path).await {
            RunOutcome::Exited(report) if report.success() => Ok(report),
            RunOutcome::Exited(report) => Err(PipelineError::ProcessExecutionFailure {
                stage,
                exit_code: report.exit_code,
                stderr: preview(&report.stderr, OUTPUT_PREVIEW_CHARS),
            }),
            RunOutcome::LaunchFailed { reason, .. } => {
                Err(PipelineError::ProcessLaunch { stage, reason })
            }
        }
    }

    /// 依次等待所有必需键，返回总等待毫秒数
    async fn await_required(&self) -> Result<u64, PipelineError> {
        let timeout = self.pipeline.key_timeout();
        let poll = self.pipeline.poll_interval();
        let started = Instant::now();

        for key in &self.pipeline.required_keys {
            match self.waiter.wait_for_key(key, timeout, poll).await {
                WaitOutcome::Ready(_) => {}
                WaitOutcome::TimedOut => {
                    return Err(PipelineError::DependencyTimeout {
                        key: key.clone(),
                        timeout_ms: self.pipeline.key_timeout_ms,
                    })
                }
                WaitOutcome::Cancelled => return Err(PipelineError::Cancelled { key: key.clone() }),
            }
        }
        Ok(started.elapsed().as_millis() as u64)
    }

    fn clear_keys(&self) -> Vec<String> {
        self.store
            .list()
            .into_iter()
            .filter(|key| key != EXECUTION_LOG_KEY)
            .filter(|key| self.store.delete(key))
            .collect()
    }

    fn build_report(&self) -> PipelineReport {
        PipelineReport::build(
            &self.store,
            self.started_at,
            self.log.len(),
            &self.pipeline.report_rules,
        )
    }

    // ---- standalone operations ----

    /// 删除除执行日志外的所有记录，返回删除数量
    pub fn clear_shared_data(&mut self) -> usize {
        let cleared = self.clear_keys();
        let count = cleared.len();
        self.log.append(
            "data_cleared",
            format!("cleared {count} shared records"),
            json!({ "cleared_count": count, "cleared_keys": cleared }),
        );
        count
    }

    pub async fn run_process(&mut self, path: &Path) -> RunOutcome {
        let outcome = self.launcher.run_sync(path).await;
        let display = path.display().to_string();
        match &outcome {
            RunOutcome::Exited(report) if report.success() => {
                self.log.append(
                    "file_execution_success",
                    format!("{display} completed"),
                    stage_data(self.launcher.name(), path, report),
                );
            }
            RunOutcome::Exited(report) => {
                self.log.append(
                    "file_execution_error",
                    format!("{display} exited with code {}", report.exit_code),
                    json!({
                        "path": display,
                        "exit_code": report.exit_code,
                        "stderr": preview(&report.stderr, OUTPUT_PREVIEW_CHARS),
                    }),
                );
            }
            RunOutcome::LaunchFailed { reason, .. } => {
                self.log.append(
                    "file_execution_exception",
                    format!("{display} could not be launched"),
                    json!({ "path": display, "reason": reason }),
                );
            }
        }
        outcome
    }

    pub async fn spawn_process(&mut self, path: &Path) -> Result<ProcessHandle, RunnerError> {
        let display = path.display().to_string();
        match self.launcher.run_async(path).await {
            Ok(handle) => {
                self.log.append(
                    "file_execution_async",
                    format!("{display} started in background"),
                    json!({ "path": display, "pid": handle.pid() }),
                );
                Ok(handle)
            }
            Err(e) => {
                self.log.append(
                    "file_execution_exception",
                    format!("{display} could not be launched"),
                    json!({ "path": display, "reason": e.to_string() }),
                );
                Err(e)
            }
        }
    }

    pub async fn wait_for_data(&mut self, key: &str, timeout: Duration) -> Option<Value> {
        let started = Instant::now();
        let outcome = self
            .waiter
            .wait_for_key(key, timeout, self.pipeline.poll_interval())
            .await;
        let waited_ms = started.elapsed().as_millis() as u64;

        match outcome {
            WaitOutcome::Ready(value) => {
                self.log.append(
                    "wait_for_data_success",
                    format!("'{key}' available"),
                    json!({ "key": key, "waited_ms": waited_ms }),
                );
                Some(value)
            }
            WaitOutcome::TimedOut | WaitOutcome::Cancelled => {
                let cancelled = outcome == WaitOutcome::Cancelled;
                self.log.append(
                    "wait_for_data_timeout",
                    format!("'{key}' not available after {waited_ms}ms"),
                    json!({
                        "key": key,
                        "timeout_ms": u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                        "cancelled": cancelled,
                    }),
                );
                None
            }
        }
    }

    pub fn check_dependencies<S: AsRef<str>>(&mut self, keys: &[S]) -> DependencyCheck {
        let check = self.waiter.check_dependencies(keys);
        let required: Vec<&str> = keys.iter().map(|k| AsRef::<str>::as_ref(k)).collect();
        self.log.append(
            "dependency_check",
            format!(
                "{}/{} dependencies available",
                check.available.len(),
                required.len()
            ),
            json!({
                "required": required,
                "available": check.available,
                "missing": check.missing,
            }),
        );
        check
    }

    /// 构建并保存报告，保存失败只记录告警
    pub fn generate_final_report(&mut self) -> PipelineReport {
        let report = self.build_report();
        if !self.store.save(&self.pipeline.report_key, &report) {
            tracing::warn!(key = %self.pipeline.report_key, "final report not persisted");
        }
        self.report = Some(report.clone());
        report
    }

    /// 监控存储中新出现的键，返回按观察顺序排列的新键
    #[tracing::instrument(name = "coordinator.monitor", skip(self))]
    pub async fn monitor(&mut self, duration: Duration) -> Vec<String> {
        let interval = self.pipeline.monitor_interval();
        let deadline = Instant::now().checked_add(duration);
        let mut known = self.store.list();
        let mut observed = Vec::new();

        loop {
            let current = self.store.list();
            // 事件日志本身的写入不算新数据
            let fresh: Vec<String> = current
                .difference(&known)
                .filter(|key| key.as_str() != EXECUTION_LOG_KEY)
                .cloned()
                .collect();
            if !fresh.is_empty() {
                for key in &fresh {
                    self.log.append(
                        "data_added",
                        format!("new record '{key}'"),
                        json!({ "key": key }),
                    );
                }
                observed.extend(fresh);
                known = current;
            }

            let now = Instant::now();
            let nap = match deadline {
                Some(deadline) if now >= deadline => break,
                Some(deadline) => interval.min(deadline - now),
                None => interval,
            };
            if !self.shutdown.sleep(nap).await {
                tracing::info!("monitor cancelled");
                break;
            }
        }
        observed
    }
}

fn stage_data(launcher: &str, path: &Path, report: &ExitReport) -> Value {
    json!({
        "launcher": launcher,
        "path": path.display().to_string(),
        "exit_code": report.exit_code,
        "stdout": preview(&report.stdout, OUTPUT_PREVIEW_CHARS),
        "duration_ms": report.duration_ms,
        "output_truncated": report.output_truncated,
    })
}

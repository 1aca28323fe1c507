use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Store directory, relative paths resolve against the project root.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub runner: RunnerConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Directory the config was found in (or the cwd). Not read from the file.
    #[serde(skip, default = "default_project_root")]
    pub project_root: PathBuf,
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_project_root() -> PathBuf {
    PathBuf::from(".")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            logging: LoggingConfig::default(),
            runner: RunnerConfig::default(),
            pipeline: PipelineConfig::default(),
            project_root: default_project_root(),
        }
    }
}

impl AppConfig {
    pub fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.project_root.join(p)
        }
    }

    pub fn data_dir_path(&self) -> PathBuf {
        self.resolve(&self.data_dir)
    }

    pub fn producer_path(&self) -> PathBuf {
        self.resolve(&self.pipeline.producer)
    }

    pub fn consumer_path(&self) -> PathBuf {
        self.resolve(&self.pipeline.consumer)
    }

    /// 日志目录：配置的相对路径基于项目根，未配置时使用系统临时目录
    pub fn log_dir_path(&self) -> PathBuf {
        match self
            .logging
            .directory
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(dir) => self.resolve(dir),
            None => std::env::temp_dir().join("handoff"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default)]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "handoff_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    #[serde(default)]
    pub directory: Option<String>,

    #[serde(default = "default_logging_file_prefix")]
    pub file_prefix: String,

    #[serde(default)]
    pub rotation: LogRotation,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    /// One file per process, named with the pid
    #[default]
    Never,
    Hourly,
    Daily,
}

impl LoggingConfig {
    /// 不滚动时文件名带 pid；滚动时由 appender 追加日期后缀
    pub fn file_name(&self, pid: u32) -> String {
        let prefix = match self.file_prefix.trim() {
            "" => "handoff",
            p => p,
        };
        match self.rotation {
            LogRotation::Never => format!("{prefix}.{pid}.log"),
            LogRotation::Hourly | LogRotation::Daily => format!("{prefix}.log"),
        }
    }
}

fn default_logging_file_prefix() -> String {
    "handoff".to_string()
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: false,
            level: default_logging_level(),
            directory: None,
            file_prefix: default_logging_file_prefix(),
            rotation: LogRotation::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// e.g. "python3"; when unset targets are executed directly
    #[serde(default)]
    pub interpreter: Option<String>,

    /// Tail kept per captured stream.
    #[serde(default = "default_capture_bytes")]
    pub capture_bytes: usize,

    /// Extra environment passed to every child.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

fn default_capture_bytes() -> usize {
    65_536
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            interpreter: None,
            capture_bytes: default_capture_bytes(),
            env: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_producer")]
    pub producer: String,

    #[serde(default = "default_consumer")]
    pub consumer: String,

    #[serde(default = "default_required_keys")]
    pub required_keys: Vec<String>,

    #[serde(default = "default_key_timeout_ms")]
    pub key_timeout_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_monitor_interval_ms")]
    pub monitor_interval_ms: u64,

    #[serde(default = "default_report_key")]
    pub report_key: String,

    #[serde(default = "default_report_rules")]
    pub report_rules: Vec<ReportRule>,
}

fn default_producer() -> String {
    "file_a_producer.py".to_string()
}

fn default_consumer() -> String {
    "file_b_consumer.py".to_string()
}

fn default_required_keys() -> Vec<String> {
    vec![
        "excel_processing_result".to_string(),
        "users".to_string(),
        "projects".to_string(),
    ]
}

fn default_key_timeout_ms() -> u64 {
    30_000
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

fn default_monitor_interval_ms() -> u64 {
    2_000
}

fn default_report_key() -> String {
    "final_pipeline_report".to_string()
}

fn default_report_rules() -> Vec<ReportRule> {
    vec![
        ReportRule::Status {
            key: "excel_processing_result".to_string(),
            field: default_status_field(),
            expected: default_status_expected(),
            ok_message: "✅ Excel data processed successfully".to_string(),
            fail_message: "❌ Excel data processing failed".to_string(),
        },
        ReportRule::Present {
            key: "consumer_status".to_string(),
            message: "✅ Data consumer finished".to_string(),
        },
        ReportRule::Present {
            key: "analysis_report".to_string(),
            message: "✅ Analysis report generated".to_string(),
        },
    ]
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            producer: default_producer(),
            consumer: default_consumer(),
            required_keys: default_required_keys(),
            key_timeout_ms: default_key_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            monitor_interval_ms: default_monitor_interval_ms(),
            report_key: default_report_key(),
            report_rules: default_report_rules(),
        }
    }
}

impl PipelineConfig {
    pub fn key_timeout(&self) -> Duration {
        Duration::from_millis(self.key_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms.max(1))
    }
}

/// One recommendation line in the final report, derived from a well-known key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportRule {
    /// Present record whose `field` equals `expected` yields `ok_message`,
    /// any other present record yields `fail_message`.
    Status {
        key: String,
        #[serde(default = "default_status_field")]
        field: String,
        #[serde(default = "default_status_expected")]
        expected: String,
        ok_message: String,
        fail_message: String,
    },
    /// Present record yields `message`.
    Present { key: String, message: String },
}

fn default_status_field() -> String {
    "status".to_string()
}

fn default_status_expected() -> String {
    "success".to_string()
}

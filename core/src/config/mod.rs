mod load;
mod types;

pub use load::{find_project_root, load, load_default, load_from_path, CONFIG_FILE_NAME};
pub use types::{
    AppConfig, LogRotation, LoggingConfig, PipelineConfig, ReportRule, RunnerConfig,
};

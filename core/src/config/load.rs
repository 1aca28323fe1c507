use anyhow::Context;
use std::path::{Path, PathBuf};

use super::types::AppConfig;

pub const CONFIG_FILE_NAME: &str = "handoff.toml";

/// Number of directories inspected, starting with `start` itself.
const ROOT_SEARCH_DEPTH: usize = 5;

/// Nearest directory at or above `start` that holds `handoff.toml`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .take(ROOT_SEARCH_DEPTH)
        .find(|dir| dir.join(CONFIG_FILE_NAME).is_file())
        .map(Path::to_path_buf)
}

/// Load a specific config file; its directory becomes the project root.
pub fn load_from_path(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let mut cfg: AppConfig =
        toml::from_str(&s).with_context(|| format!("invalid config {}", path.display()))?;
    cfg.project_root = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::env::current_dir()?,
    };
    Ok(cfg)
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    let cwd = std::env::current_dir().context("cannot determine current directory")?;

    // Priority 1: handoff.toml in the project root
    // Priority 2: built-in defaults rooted at the cwd
    let mut cfg = match find_project_root(&cwd) {
        Some(root) => load_from_path(&root.join(CONFIG_FILE_NAME))?,
        None => AppConfig {
            project_root: cwd,
            ..AppConfig::default()
        },
    };

    // Environment variable overrides (highest)
    apply_env_overrides(&mut cfg, |k| std::env::var(k).ok());
    Ok(cfg)
}

/// `--config` 显式路径优先，否则按 [`load_default`] 查找；两种情况都应用环境变量覆盖
pub fn load(explicit: Option<&Path>) -> anyhow::Result<AppConfig> {
    match explicit {
        Some(path) => {
            let mut cfg = load_from_path(path)?;
            apply_env_overrides(&mut cfg, |k| std::env::var(k).ok());
            Ok(cfg)
        }
        None => load_default(),
    }
}

pub(crate) fn apply_env_overrides<F>(cfg: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("HANDOFF_DATA_DIR").filter(|v| !v.trim().is_empty()) {
        cfg.data_dir = v;
    }
    if let Some(v) = lookup("HANDOFF_LOG_LEVEL").filter(|v| !v.trim().is_empty()) {
        cfg.logging.level = v;
    }
}

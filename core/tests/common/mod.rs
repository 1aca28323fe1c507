#![allow(dead_code)]

use std::path::{Path, PathBuf};

use handoff_core::api::AppConfig;
use tempfile::TempDir;

/// 临时项目目录，脚本放在根目录，数据目录为 `data/`
pub struct Project {
    pub dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("tempdir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn config(&self, producer: &str, consumer: &str) -> AppConfig {
        let mut cfg = AppConfig {
            project_root: self.root().to_path_buf(),
            ..AppConfig::default()
        };
        cfg.pipeline.producer = producer.to_string();
        cfg.pipeline.consumer = consumer.to_string();
        cfg.pipeline.key_timeout_ms = 2_000;
        cfg.pipeline.poll_interval_ms = 25;
        cfg
    }

    #[cfg(unix)]
    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = self.root().join(name);
        std::fs::write(&path, format!("#!/bin/sh\nset -e\n{body}\n")).expect("write script");
        let mut perms = std::fs::metadata(&path).expect("metadata").permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).expect("chmod");
        path
    }
}

/// 把一条 JSON 记录写进共享存储的 shell 片段
pub fn put_record(key: &str, json: &str) -> String {
    format!("printf '%s' '{json}' > \"$HANDOFF_STORE_DIR/{key}.json\"")
}

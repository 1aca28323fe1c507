//! # 依赖等待
//!
//! 轮询共享存储，直到所需的键出现或超时。轮询间隔内的睡眠可被 [`Shutdown`] 打断。
//! 值为 JSON `null` 的记录视为尚未就绪。

use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;

use crate::shutdown::Shutdown;
use crate::store::Store;

/// `wait_for_key` 的结果
#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome {
    Ready(Value),
    TimedOut,
    Cancelled,
}

impl WaitOutcome {
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Ready(v) => Some(v),
            _ => None,
        }
    }
}

/// 单次依赖检查的结果，两个列表都保持输入顺序
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyCheck {
    pub available: Vec<String>,
    pub missing: Vec<String>,
}

impl DependencyCheck {
    pub fn all_satisfied(&self) -> bool {
        self.missing.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct DependencyWaiter {
    store: Store,
    shutdown: Shutdown,
}

impl DependencyWaiter {
    pub fn new(store: Store, shutdown: Shutdown) -> Self {
        Self { store, shutdown }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    fn ready_value(&self, key: &str) -> Option<Value> {
        self.store.get(key).filter(|v| !v.is_null())
    }

    /// 阻塞等待 `key` 出现。
    ///
    /// 每 `poll_interval` 检查一次；最后一次睡眠截断到剩余时间，
    /// 截止时刻再检查一次后才判定超时。
    #[tracing::instrument(name = "waiter.wait_for_key", skip(self))]
    pub async fn wait_for_key(
        &self,
        key: &str,
        timeout: Duration,
        poll_interval: Duration,
    ) -> WaitOutcome {
        // 超出 Instant 表示范围的超时视为无限等待
        let deadline = Instant::now().checked_add(timeout);

        loop {
            if let Some(value) = self.ready_value(key) {
                tracing::debug!("key available");
                return WaitOutcome::Ready(value);
            }

            let now = Instant::now();
            let nap = match deadline {
                Some(deadline) if now >= deadline => {
                    tracing::info!("wait timed out");
                    return WaitOutcome::TimedOut;
                }
                Some(deadline) => poll_interval.min(deadline - now),
                None => poll_interval,
            };
            if !self.shutdown.sleep(nap).await {
                tracing::info!("wait cancelled");
                return WaitOutcome::Cancelled;
            }
        }
    }

    /// 非阻塞的单次检查
    pub fn check_dependencies<S: AsRef<str>>(&self, required_keys: &[S]) -> DependencyCheck {
        let mut check = DependencyCheck::default();
        for key in required_keys {
            let key = key.as_ref();
            if self.ready_value(key).is_some() {
                check.available.push(key.to_string());
            } else {
                check.missing.push(key.to_string());
            }
        }
        check
    }
}

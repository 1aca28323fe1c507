//! 关闭信号：让轮询等待和监控在收到信号后立即返回，而不是等到下一次轮询

use std::time::Duration;
use tokio::sync::watch;

/// 可克隆的关闭信号，任一克隆调用 `trigger` 后所有克隆都能观察到
#[derive(Clone, Debug)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx, rx }
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// 等待信号被触发；已触发时立即返回
    pub async fn triggered(&self) {
        let mut rx = self.rx.clone();
        // 发送端由 self 持有，wait_for 只会在信号触发后返回
        let _ = rx.wait_for(|v| *v).await;
    }

    /// 睡眠 `dur`，期间收到信号则提前返回 false
    pub async fn sleep(&self, dur: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(dur) => true,
            _ = self.triggered() => false,
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_sleep_completes_without_signal() {
        let shutdown = Shutdown::new();
        assert!(shutdown.sleep(Duration::from_millis(10)).await);
        assert!(!shutdown.is_triggered());
    }

    #[tokio::test]
    async fn test_trigger_interrupts_sleep() {
        let shutdown = Shutdown::new();
        let remote = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            remote.trigger();
        });

        let started = Instant::now();
        assert!(!shutdown.sleep(Duration::from_secs(10)).await);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn test_already_triggered_returns_immediately() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        assert!(!shutdown.sleep(Duration::from_secs(10)).await);
    }
}

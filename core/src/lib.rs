//! handoff-core: 进程间共享数据存储与生产者/消费者流水线协调。
//!
//! - [`store`]: 目录型键值存储，每个键一个 JSON 文件
//! - [`runner`]: 外部进程的同步/异步启动与输出捕获
//! - [`waiter`]: 轮询等待存储中的依赖键
//! - [`coordinator`]: 固定五阶段流水线状态机、事件日志与最终报告

pub mod api;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod runner;
pub mod shutdown;
pub mod store;
pub mod util;
pub mod waiter;

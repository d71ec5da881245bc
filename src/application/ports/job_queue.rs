//! Job Queue Port - 任务队列与状态存储
//!
//! 抽象阻塞弹出任务、写回状态记录、推送任务结果三类操作，
//! 具体实现在 infrastructure/queue (Redis) 与 infrastructure/memory 中

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::domain::{StatusRecord, TaskResult};

/// 队列错误
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue connection error: {0}")]
    Connection(String),

    #[error("Queue command failed: {0}")]
    Command(String),

    #[error("Invalid stored record: {0}")]
    InvalidRecord(String),
}

/// Job Queue Port
#[async_trait]
pub trait JobQueuePort: Send + Sync {
    /// 阻塞弹出一个任务，超时返回 `None`
    ///
    /// `timeout` 为零表示无限等待
    async fn pop(&self, timeout: Duration) -> Result<Option<Vec<u8>>, QueueError>;

    /// 将任务推入任务队列尾部
    async fn enqueue(&self, payload: &[u8]) -> Result<(), QueueError>;

    /// 写入任务状态记录
    async fn put_status(&self, task_id: &str, record: &StatusRecord) -> Result<(), QueueError>;

    /// 读取任务状态记录
    async fn get_status(&self, task_id: &str) -> Result<Option<StatusRecord>, QueueError>;

    /// 推送任务结果到结果队列（未配置结果队列时为空操作）
    async fn push_result(&self, result: &TaskResult) -> Result<(), QueueError>;

    /// 检查后端是否可用
    async fn ping(&self) -> Result<(), QueueError>;
}

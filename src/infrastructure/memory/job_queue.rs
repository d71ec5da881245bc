//! In-Memory Job Queue Implementation
//!
//! 进程内的任务队列，仅用于测试与本地冒烟运行（queue.backend = memory）。
//! 结果列表有上限，状态记录只有配置了 `status_ttl` 才会过期，
//! 不适合长时间运行。

use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Notify;

use async_trait::async_trait;

use crate::application::ports::{JobQueuePort, QueueError};
use crate::domain::{StatusRecord, TaskResult};

/// 内存队列配置，与 RedisQueueConfig 的写回选项一致
#[derive(Debug, Clone)]
pub struct InMemoryQueueConfig {
    /// 为 None 时不记录结果
    pub result_queue: Option<String>,
    /// 状态记录过期时间，None 表示不过期
    pub status_ttl: Option<Duration>,
    /// 最多保留的结果条数，超出后丢弃最早的
    pub max_results: usize,
}

impl Default for InMemoryQueueConfig {
    fn default() -> Self {
        Self {
            result_queue: Some("VVS:GPU_TASK_RESULT_QUEUE".to_string()),
            status_ttl: None,
            max_results: 10_000,
        }
    }
}

struct StoredStatus {
    json: String,
    expires_at: Option<Instant>,
}

impl StoredStatus {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map_or(false, |at| at <= now)
    }
}

/// 内存任务队列
pub struct InMemoryJobQueue {
    config: InMemoryQueueConfig,
    /// 待处理任务
    pending: tokio::sync::Mutex<VecDeque<Vec<u8>>>,
    /// 有新任务时唤醒 pop
    notify: Notify,
    /// task_id -> 状态记录 JSON
    statuses: DashMap<String, StoredStatus>,
    /// 已推送的任务结果
    results: Mutex<VecDeque<TaskResult>>,
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self::with_config(InMemoryQueueConfig::default())
    }

    pub fn with_config(config: InMemoryQueueConfig) -> Self {
        Self {
            config,
            pending: tokio::sync::Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            statuses: DashMap::new(),
            results: Mutex::new(VecDeque::new()),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 已推送结果的快照
    pub fn results(&self) -> Vec<TaskResult> {
        self.results
            .lock()
            .map(|results| results.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// 当前排队中的任务数
    pub async fn len(&self) -> usize {
        self.pending.lock().await.len()
    }
}

impl Default for InMemoryJobQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobQueuePort for InMemoryJobQueue {
    async fn pop(&self, timeout: Duration) -> Result<Option<Vec<u8>>, QueueError> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let notified = self.notify.notified();

            if let Some(payload) = self.pending.lock().await.pop_front() {
                return Ok(Some(payload));
            }

            if timeout.is_zero() {
                notified.await;
            } else if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn enqueue(&self, payload: &[u8]) -> Result<(), QueueError> {
        self.pending.lock().await.push_back(payload.to_vec());
        self.notify.notify_one();
        Ok(())
    }

    async fn put_status(&self, task_id: &str, record: &StatusRecord) -> Result<(), QueueError> {
        let now = Instant::now();
        self.statuses.retain(|_, status| !status.is_expired(now));
        self.statuses.insert(
            task_id.to_string(),
            StoredStatus {
                json: record.to_json(),
                expires_at: self.config.status_ttl.map(|ttl| now + ttl),
            },
        );
        Ok(())
    }

    async fn get_status(&self, task_id: &str) -> Result<Option<StatusRecord>, QueueError> {
        let now = Instant::now();
        self.statuses.remove_if(task_id, |_, status| status.is_expired(now));

        self.statuses
            .get(task_id)
            .map(|status| {
                serde_json::from_str(&status.json)
                    .map_err(|e| QueueError::InvalidRecord(e.to_string()))
            })
            .transpose()
    }

    async fn push_result(&self, result: &TaskResult) -> Result<(), QueueError> {
        if self.config.result_queue.is_none() {
            return Ok(());
        }

        let mut results = self
            .results
            .lock()
            .map_err(|_| QueueError::Command("result list poisoned".to_string()))?;
        results.push_back(result.clone());
        while results.len() > self.config.max_results {
            results.pop_front();
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), QueueError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RetCode;

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = InMemoryJobQueue::new();
        queue.enqueue(b"first").await.unwrap();
        queue.enqueue(b"second").await.unwrap();

        let timeout = Duration::from_millis(10);
        assert_eq!(queue.pop(timeout).await.unwrap().unwrap(), b"first");
        assert_eq!(queue.pop(timeout).await.unwrap().unwrap(), b"second");
        assert_eq!(queue.len().await, 0);
    }

    #[tokio::test]
    async fn test_pop_times_out_when_empty() {
        let queue = InMemoryJobQueue::new();
        let popped = queue.pop(Duration::from_millis(20)).await.unwrap();
        assert!(popped.is_none());
    }

    #[tokio::test]
    async fn test_pop_wakes_on_enqueue() {
        let queue = Arc::new(InMemoryJobQueue::new());

        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.pop(Duration::ZERO).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.enqueue(b"job").await.unwrap();

        let popped = consumer.await.unwrap().unwrap();
        assert_eq!(popped.unwrap(), b"job");
    }

    #[tokio::test]
    async fn test_status_overwrite() {
        let queue = InMemoryJobQueue::new();
        queue
            .put_status("t-1", &StatusRecord::fail(RetCode::Fail, "first"))
            .await
            .unwrap();
        queue
            .put_status("t-1", &StatusRecord::uploaded("https://x/y.wav"))
            .await
            .unwrap();

        let status = queue.get_status("t-1").await.unwrap().unwrap();
        assert!(status.is_ok());
        assert!(queue.get_status("t-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_no_result_queue_records_nothing() {
        let queue = InMemoryJobQueue::with_config(InMemoryQueueConfig {
            result_queue: None,
            ..Default::default()
        });
        queue
            .push_result(&TaskResult::success("t-1", "https://x/y.wav"))
            .await
            .unwrap();
        assert!(queue.results().is_empty());
    }

    #[tokio::test]
    async fn test_status_expires_after_ttl() {
        let queue = InMemoryJobQueue::with_config(InMemoryQueueConfig {
            status_ttl: Some(Duration::from_millis(30)),
            ..Default::default()
        });
        queue
            .put_status("t-1", &StatusRecord::fail(RetCode::Fail, "boom"))
            .await
            .unwrap();
        assert!(queue.get_status("t-1").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(queue.get_status("t-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_results_are_capped() {
        let queue = InMemoryJobQueue::with_config(InMemoryQueueConfig {
            max_results: 2,
            ..Default::default()
        });
        for i in 0..3 {
            queue
                .push_result(&TaskResult::success(format!("t-{}", i), "https://x/y.wav"))
                .await
                .unwrap();
        }

        let results = queue.results();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].task_id.as_deref(), Some("t-1"));
        assert_eq!(results[1].task_id.as_deref(), Some("t-2"));
    }
}

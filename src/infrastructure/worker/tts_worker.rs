//! TTS Worker - 队列消费主循环
//!
//! 从任务队列阻塞弹出任务，交给 ProcessJobHandler 处理，
//! semaphore 限制同时处理的任务数

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::application::{JobOutcome, JobQueuePort, ProcessJobCommand, ProcessJobHandler};

const MIN_POP_TIMEOUT: Duration = Duration::from_secs(1);

/// Worker 配置
#[derive(Debug, Clone)]
pub struct TtsWorkerConfig {
    /// 最大并发任务数
    pub concurrency: usize,
    /// 单次阻塞弹出超时，决定停机信号的响应延迟；为 0 时按 1 秒处理
    pub pop_timeout: Duration,
    /// 队列出错后的重试间隔
    pub retry_delay: Duration,
}

impl Default for TtsWorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            pop_timeout: Duration::from_secs(5),
            retry_delay: Duration::from_millis(1000),
        }
    }
}

/// TTS Worker
///
/// 后台任务处理器，从队列消费任务直到收到停机信号
pub struct TtsWorker {
    config: TtsWorkerConfig,
    queue: Arc<dyn JobQueuePort>,
    handler: Arc<ProcessJobHandler>,
}

impl TtsWorker {
    pub fn new(
        config: TtsWorkerConfig,
        queue: Arc<dyn JobQueuePort>,
        handler: Arc<ProcessJobHandler>,
    ) -> Self {
        Self {
            config,
            queue,
            handler,
        }
    }

    /// 启动 Worker，`shutdown` 取消后等待进行中的任务完成再返回
    pub async fn run(self, shutdown: CancellationToken) {
        let concurrency = self.config.concurrency.max(1);
        // 0 对 BLPOP 意味着永久阻塞，停机信号将无法被观察到
        let pop_timeout = if self.config.pop_timeout.is_zero() {
            tracing::warn!("Zero pop timeout would block shutdown, using 1s");
            MIN_POP_TIMEOUT
        } else {
            self.config.pop_timeout
        };
        tracing::info!(
            concurrency = concurrency,
            pop_timeout_ms = pop_timeout.as_millis() as u64,
            "TtsWorker started"
        );

        // 使用 semaphore 控制并发
        let semaphore = Arc::new(Semaphore::new(concurrency));

        loop {
            // 先拿到 permit 再弹出任务，避免任务出队后排队等待
            let permit = tokio::select! {
                _ = shutdown.cancelled() => break,
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => {
                        tracing::error!("Worker semaphore closed");
                        break;
                    }
                },
            };

            if shutdown.is_cancelled() {
                break;
            }

            // 不在 pop 上 select：丢弃进行中的 BLPOP 可能丢任务
            let payload = match self.queue.pop(pop_timeout).await {
                Ok(Some(payload)) => payload,
                Ok(None) => continue,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to pop job from queue");
                    drop(permit);
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.config.retry_delay) => continue,
                    }
                }
            };

            let handler = self.handler.clone();
            tokio::spawn(async move {
                let _permit = permit; // 持有 permit 直到任务完成

                match handler.handle(ProcessJobCommand { payload }).await {
                    JobOutcome::Succeeded { task_id, file_url, .. } => {
                        tracing::debug!(task_id = %task_id, file_url = %file_url, "Job finished");
                    }
                    JobOutcome::Failed { task_id, stage, .. } => {
                        tracing::debug!(task_id = %task_id, stage = stage.as_str(), "Job failed");
                    }
                    JobOutcome::Skipped { reason } => {
                        tracing::debug!(reason = %reason, "Job skipped");
                    }
                }
            });
        }

        tracing::info!("Shutdown requested, waiting for in-flight jobs");
        // 收回全部 permit 即所有任务已完成
        let _ = semaphore.acquire_many(concurrency as u32).await;
        tracing::info!("TtsWorker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{
        AudioFetcherPort, FetchError, ObjectStoragePort, QueueError, StorageError,
    };
    use crate::application::ProcessJobSettings;
    use crate::domain::{StatusRecord, TaskResult};
    use crate::infrastructure::adapters::{FakeTtsClient, FakeTtsClientConfig, WavEncoder};
    use crate::infrastructure::memory::InMemoryJobQueue;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct OkFetcher;

    #[async_trait]
    impl AudioFetcherPort for OkFetcher {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
            Ok(b"ref".to_vec())
        }
    }

    struct NullStorage;

    #[async_trait]
    impl ObjectStoragePort for NullStorage {
        async fn put_object(
            &self,
            _key: &str,
            _data: Vec<u8>,
            _content_type: &str,
        ) -> Result<(), StorageError> {
            Ok(())
        }

        fn object_url(&self, key: &str) -> String {
            format!("https://bucket.example.com{}", key)
        }
    }

    fn handler(queue: Arc<dyn JobQueuePort>, latency_ms: u64) -> Arc<ProcessJobHandler> {
        Arc::new(ProcessJobHandler::new(
            queue,
            Arc::new(OkFetcher),
            Arc::new(FakeTtsClient::new(FakeTtsClientConfig {
                latency_ms,
                ..Default::default()
            })),
            Arc::new(WavEncoder::new()),
            Arc::new(NullStorage),
            ProcessJobSettings::default(),
        ))
    }

    fn config() -> TtsWorkerConfig {
        TtsWorkerConfig {
            concurrency: 2,
            pop_timeout: Duration::from_millis(20),
            retry_delay: Duration::from_millis(10),
        }
    }

    fn payload(task_id: &str) -> Vec<u8> {
        serde_json::json!({
            "audioFileUrl": "https://example.com/ref.wav",
            "audioText": "参考",
            "personId": "7",
            "taskId": task_id,
            "content": "你好"
        })
        .to_string()
        .into_bytes()
    }

    #[tokio::test]
    async fn test_worker_drains_queue() {
        let queue = InMemoryJobQueue::new().arc();
        for i in 0..3 {
            queue.enqueue(&payload(&format!("t-{}", i))).await.unwrap();
        }

        let worker = TtsWorker::new(config(), queue.clone(), handler(queue.clone(), 0));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(worker.run(shutdown.clone()));

        for _ in 0..100 {
            if queue.results().len() == 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        shutdown.cancel();
        handle.await.unwrap();

        assert_eq!(queue.results().len(), 3);
        assert!(queue.results().iter().all(|r| r.code == 0));
        let status = queue.get_status("t-1").await.unwrap().unwrap();
        assert!(status.is_ok());
        assert_eq!(queue.len().await, 0);
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_in_flight_job() {
        let queue = InMemoryJobQueue::new().arc();
        queue.enqueue(&payload("slow")).await.unwrap();

        let worker = TtsWorker::new(config(), queue.clone(), handler(queue.clone(), 200));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(worker.run(shutdown.clone()));

        // 等待任务出队
        for _ in 0..100 {
            if queue.len().await == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        shutdown.cancel();
        handle.await.unwrap();

        assert_eq!(queue.results().len(), 1);
    }

    /// 前两次 pop 失败，之后转发到内存队列
    struct FlakyQueue {
        inner: Arc<InMemoryJobQueue>,
        failures: AtomicUsize,
    }

    #[async_trait]
    impl JobQueuePort for FlakyQueue {
        async fn pop(&self, timeout: Duration) -> Result<Option<Vec<u8>>, QueueError> {
            if self.failures.fetch_add(1, Ordering::SeqCst) < 2 {
                return Err(QueueError::Connection("connection refused".to_string()));
            }
            self.inner.pop(timeout).await
        }

        async fn enqueue(&self, payload: &[u8]) -> Result<(), QueueError> {
            self.inner.enqueue(payload).await
        }

        async fn put_status(&self, task_id: &str, record: &StatusRecord) -> Result<(), QueueError> {
            self.inner.put_status(task_id, record).await
        }

        async fn get_status(&self, task_id: &str) -> Result<Option<StatusRecord>, QueueError> {
            self.inner.get_status(task_id).await
        }

        async fn push_result(&self, result: &TaskResult) -> Result<(), QueueError> {
            self.inner.push_result(result).await
        }

        async fn ping(&self) -> Result<(), QueueError> {
            self.inner.ping().await
        }
    }

    #[tokio::test]
    async fn test_worker_survives_queue_errors() {
        let inner = InMemoryJobQueue::new().arc();
        inner.enqueue(&payload("after-error")).await.unwrap();
        let queue: Arc<dyn JobQueuePort> = Arc::new(FlakyQueue {
            inner: inner.clone(),
            failures: AtomicUsize::new(0),
        });

        let worker = TtsWorker::new(config(), queue.clone(), handler(queue, 0));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(worker.run(shutdown.clone()));

        for _ in 0..100 {
            if !inner.results().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        shutdown.cancel();
        handle.await.unwrap();

        assert_eq!(inner.results().len(), 1);
        assert_eq!(inner.results()[0].task_id.as_deref(), Some("after-error"));
    }

    #[tokio::test]
    async fn test_zero_pop_timeout_still_stops() {
        let queue = InMemoryJobQueue::new().arc();
        let worker = TtsWorker::new(
            TtsWorkerConfig {
                pop_timeout: Duration::ZERO,
                ..config()
            },
            queue.clone(),
            handler(queue, 0),
        );
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(worker.run(shutdown.clone()));

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.cancel();

        let stopped = tokio::time::timeout(Duration::from_secs(2), handle).await;
        assert!(stopped.is_ok(), "worker kept blocking on an empty queue");
    }
}

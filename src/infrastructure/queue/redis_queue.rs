//! Redis Job Queue - 基于 Redis List 的任务队列
//!
//! - 任务队列: `BLPOP {task_queue}`
//! - 状态记录: `SET {status_key_prefix}{task_id} <json> [EX ttl]`
//! - 结果队列: `RPUSH {result_queue} <json>`
//!
//! BLPOP 会占住连接，因此阻塞弹出与其它命令使用两条独立的连接。
//! 连接出错后丢弃，下一次调用时重新建立。

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{Client, RedisError};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::application::ports::{JobQueuePort, QueueError};
use crate::domain::{StatusRecord, TaskResult};

/// Redis 队列配置
#[derive(Debug, Clone)]
pub struct RedisQueueConfig {
    /// redis://[:password@]host:port/db
    pub url: String,
    pub task_queue: String,
    /// 为 None 时不推送结果
    pub result_queue: Option<String>,
    pub status_key_prefix: String,
    /// 状态记录过期时间，None 表示不过期
    pub status_ttl: Option<Duration>,
}

impl Default for RedisQueueConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379/0".to_string(),
            task_queue: "VVS:TTS:TaskQueue".to_string(),
            result_queue: Some("VVS:GPU_TASK_RESULT_QUEUE".to_string()),
            status_key_prefix: "TTS:task_result:".to_string(),
            status_ttl: None,
        }
    }
}

impl RedisQueueConfig {
    /// 状态记录的完整 key
    pub fn status_key(&self, task_id: &str) -> String {
        format!("{}{}", self.status_key_prefix, task_id)
    }
}

/// Redis 任务队列
pub struct RedisJobQueue {
    client: Client,
    config: RedisQueueConfig,
    /// 专用于 BLPOP 的连接
    pop_conn: Mutex<Option<MultiplexedConnection>>,
    /// SET / RPUSH / GET 等普通命令
    cmd_conn: Mutex<Option<MultiplexedConnection>>,
}

impl RedisJobQueue {
    /// 创建队列（不立即连接）
    pub fn new(config: RedisQueueConfig) -> Result<Self, QueueError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| QueueError::Connection(format!("Invalid redis url: {}", e)))?;

        Ok(Self {
            client,
            config,
            pop_conn: Mutex::new(None),
            cmd_conn: Mutex::new(None),
        })
    }

    /// 创建队列并验证连接
    pub async fn connect(config: RedisQueueConfig) -> Result<Self, QueueError> {
        let queue = Self::new(config)?;
        queue.ping().await?;
        tracing::info!(task_queue = %queue.config.task_queue, "Redis queue connected");
        Ok(queue)
    }

    pub fn config(&self) -> &RedisQueueConfig {
        &self.config
    }

    async fn open(&self) -> Result<MultiplexedConnection, QueueError> {
        self.client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|e| QueueError::Connection(e.to_string()))
    }

    /// 在指定连接上执行命令，失败后丢弃该连接
    async fn with_conn<T, F, Fut>(
        &self,
        slot: &Mutex<Option<MultiplexedConnection>>,
        f: F,
    ) -> Result<T, QueueError>
    where
        F: FnOnce(MultiplexedConnection) -> Fut,
        Fut: std::future::Future<Output = Result<T, RedisError>>,
    {
        let conn = {
            let mut guard = slot.lock().await;
            match guard.as_ref() {
                Some(conn) => conn.clone(),
                None => {
                    let conn = self.open().await?;
                    *guard = Some(conn.clone());
                    conn
                }
            }
        };

        match f(conn).await {
            Ok(value) => Ok(value),
            Err(e) => {
                if is_connection_error(&e) {
                    tracing::warn!(error = %e, "Redis connection lost, will reconnect");
                    *slot.lock().await = None;
                    Err(QueueError::Connection(e.to_string()))
                } else {
                    Err(QueueError::Command(e.to_string()))
                }
            }
        }
    }
}

fn is_connection_error(e: &RedisError) -> bool {
    e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout()
}

/// BLPOP 只接受整秒，非零的亚秒超时向上取整，避免变成 0（永久阻塞）
fn blpop_timeout_secs(timeout: Duration) -> u64 {
    if timeout.is_zero() {
        0
    } else {
        timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0)
    }
}

#[async_trait]
impl JobQueuePort for RedisJobQueue {
    async fn pop(&self, timeout: Duration) -> Result<Option<Vec<u8>>, QueueError> {
        let queue = self.config.task_queue.clone();
        let timeout_secs = blpop_timeout_secs(timeout);

        let popped: Option<(String, Vec<u8>)> = self
            .with_conn(&self.pop_conn, |mut conn| async move {
                redis::cmd("BLPOP")
                    .arg(&queue)
                    .arg(timeout_secs)
                    .query_async(&mut conn)
                    .await
            })
            .await?;

        Ok(popped.map(|(_, payload)| payload))
    }

    async fn enqueue(&self, payload: &[u8]) -> Result<(), QueueError> {
        let queue = self.config.task_queue.clone();
        let payload = payload.to_vec();

        self.with_conn(&self.cmd_conn, |mut conn| async move {
            let _: i64 = redis::cmd("RPUSH")
                .arg(&queue)
                .arg(payload)
                .query_async(&mut conn)
                .await?;
            Ok(())
        })
        .await
    }

    async fn put_status(&self, task_id: &str, record: &StatusRecord) -> Result<(), QueueError> {
        let key = self.config.status_key(task_id);
        let value = record.to_json();
        let ttl = self.config.status_ttl.map(|d| d.as_secs()).filter(|s| *s > 0);

        self.with_conn(&self.cmd_conn, |mut conn| async move {
            let mut cmd = redis::cmd("SET");
            cmd.arg(&key).arg(value);
            if let Some(ttl) = ttl {
                cmd.arg("EX").arg(ttl);
            }
            let _: () = cmd.query_async(&mut conn).await?;
            Ok(())
        })
        .await
    }

    async fn get_status(&self, task_id: &str) -> Result<Option<StatusRecord>, QueueError> {
        let key = self.config.status_key(task_id);

        let raw: Option<String> = self
            .with_conn(&self.cmd_conn, |mut conn| async move {
                redis::cmd("GET").arg(&key).query_async(&mut conn).await
            })
            .await?;

        raw.map(|raw| {
            serde_json::from_str(&raw).map_err(|e| QueueError::InvalidRecord(e.to_string()))
        })
        .transpose()
    }

    async fn push_result(&self, result: &TaskResult) -> Result<(), QueueError> {
        let Some(queue) = self.config.result_queue.clone() else {
            return Ok(());
        };
        let value = result.to_json();

        self.with_conn(&self.cmd_conn, |mut conn| async move {
            let _: i64 = redis::cmd("RPUSH")
                .arg(&queue)
                .arg(value)
                .query_async(&mut conn)
                .await?;
            Ok(())
        })
        .await
    }

    async fn ping(&self) -> Result<(), QueueError> {
        self.with_conn(&self.cmd_conn, |mut conn| async move {
            let _: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_key() {
        let config = RedisQueueConfig::default();
        assert_eq!(config.status_key("42"), "TTS:task_result:42");
    }

    #[test]
    fn test_sub_second_timeout_rounds_up() {
        assert_eq!(blpop_timeout_secs(Duration::from_millis(20)), 1);
        assert_eq!(blpop_timeout_secs(Duration::from_millis(1500)), 2);
        assert_eq!(blpop_timeout_secs(Duration::from_secs(5)), 5);
        assert_eq!(blpop_timeout_secs(Duration::ZERO), 0);
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let result = RedisJobQueue::new(RedisQueueConfig {
            url: "not a url".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(QueueError::Connection(_))));
    }

    #[tokio::test]
    async fn test_unreachable_server_reports_connection_error() {
        let queue = RedisJobQueue::new(RedisQueueConfig {
            url: "redis://127.0.0.1:1/0".to_string(),
            ..Default::default()
        })
        .unwrap();

        let err = queue.ping().await.unwrap_err();
        assert!(matches!(err, QueueError::Connection(_)));
    }
}

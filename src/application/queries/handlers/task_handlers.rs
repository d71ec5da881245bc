//! Task Query Handlers

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{JobQueuePort, TtsEnginePort};
use crate::application::queries::task_queries::*;

/// GetTaskStatus Handler - 读取任务状态记录
pub struct GetTaskStatusHandler {
    queue: Arc<dyn JobQueuePort>,
}

impl GetTaskStatusHandler {
    pub fn new(queue: Arc<dyn JobQueuePort>) -> Self {
        Self { queue }
    }

    pub async fn handle(
        &self,
        query: GetTaskStatusQuery,
    ) -> Result<GetTaskStatusResponse, ApplicationError> {
        if query.task_id.trim().is_empty() {
            return Err(ApplicationError::validation("taskId cannot be empty"));
        }

        let status = self
            .queue
            .get_status(&query.task_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Task", query.task_id.clone()))?;

        Ok(GetTaskStatusResponse {
            task_id: query.task_id,
            status,
        })
    }
}

/// GetHealth Handler - 检查队列与 TTS 引擎
pub struct GetHealthHandler {
    queue: Arc<dyn JobQueuePort>,
    tts_engine: Arc<dyn TtsEnginePort>,
}

impl GetHealthHandler {
    pub fn new(queue: Arc<dyn JobQueuePort>, tts_engine: Arc<dyn TtsEnginePort>) -> Self {
        Self { queue, tts_engine }
    }

    pub async fn handle(&self, _query: GetHealthQuery) -> HealthReport {
        let (queue, tts_ok) = tokio::join!(self.queue.ping(), self.tts_engine.health_check());

        HealthReport {
            queue_ok: queue.is_ok(),
            queue_error: queue.err().map(|e| e.to_string()),
            tts_ok,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RetCode, StatusRecord};
    use crate::infrastructure::adapters::{FakeTtsClient, FakeTtsClientConfig};
    use crate::infrastructure::memory::InMemoryJobQueue;

    #[tokio::test]
    async fn test_status_found() {
        let queue = Arc::new(InMemoryJobQueue::new());
        let record = StatusRecord::fail(RetCode::Fail, "boom");
        queue.put_status("t-1", &record).await.unwrap();

        let handler = GetTaskStatusHandler::new(queue);
        let response = handler
            .handle(GetTaskStatusQuery {
                task_id: "t-1".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(response.status, record);
    }

    #[tokio::test]
    async fn test_status_missing_is_not_found() {
        let handler = GetTaskStatusHandler::new(Arc::new(InMemoryJobQueue::new()));
        let err = handler
            .handle(GetTaskStatusQuery {
                task_id: "nope".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_health_reports_all_ok() {
        let handler = GetHealthHandler::new(
            Arc::new(InMemoryJobQueue::new()),
            Arc::new(FakeTtsClient::new(FakeTtsClientConfig::default())),
        );
        let report = handler.handle(GetHealthQuery).await;
        assert!(report.is_healthy());
        assert!(report.queue_error.is_none());
    }
}

//! Task Queries - 任务状态查询

use crate::domain::StatusRecord;

/// 查询任务状态
#[derive(Debug, Clone)]
pub struct GetTaskStatusQuery {
    pub task_id: String,
}

#[derive(Debug, Clone)]
pub struct GetTaskStatusResponse {
    pub task_id: String,
    pub status: StatusRecord,
}

/// 查询依赖服务健康状况
#[derive(Debug, Clone, Default)]
pub struct GetHealthQuery;

#[derive(Debug, Clone)]
pub struct HealthReport {
    pub queue_ok: bool,
    pub queue_error: Option<String>,
    pub tts_ok: bool,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.queue_ok && self.tts_ok
    }
}

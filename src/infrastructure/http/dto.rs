//! Data Transfer Objects

use serde::Serialize;

use crate::domain::StatusRecord;

// ============================================================================
// 统一响应结构
// ============================================================================

/// 统一 API 响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub errno: i32,
    pub error: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 成功响应
    pub fn success(data: T) -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(data),
        }
    }
}

// ============================================================================
// Task DTOs
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTaskResponse {
    pub task_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusResponse {
    pub task_id: String,
    /// 与 Redis 中存储的状态记录一致
    pub status: StatusRecord,
}

// ============================================================================
// Health DTOs
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok" 或 "degraded"
    pub status: &'static str,
    pub queue: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_error: Option<String>,
    pub tts: bool,
}

//! Task Handlers

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::application::{GetTaskStatusQuery, SubmitJobCommand};
use crate::domain::TtsJob;
use crate::infrastructure::http::dto::{ApiResponse, SubmitTaskResponse, TaskStatusResponse};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

// ============================================================================
// Submit Task
// ============================================================================

/// 手动提交任务到任务队列，请求体与队列中的任务格式一致
pub async fn submit_task(
    State(state): State<Arc<AppState>>,
    Json(job): Json<TtsJob>,
) -> Result<Json<ApiResponse<SubmitTaskResponse>>, ApiError> {
    let result = state
        .submit_job_handler
        .handle(SubmitJobCommand { job })
        .await?;

    Ok(Json(ApiResponse::success(SubmitTaskResponse {
        task_id: result.task_id,
    })))
}

// ============================================================================
// Task Status
// ============================================================================

pub async fn task_status(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<ApiResponse<TaskStatusResponse>>, ApiError> {
    let result = state
        .get_task_status_handler
        .handle(GetTaskStatusQuery { task_id })
        .await?;

    Ok(Json(ApiResponse::success(TaskStatusResponse {
        task_id: result.task_id,
        status: result.status,
    })))
}

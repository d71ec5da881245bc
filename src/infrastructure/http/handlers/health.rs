//! Health Handler

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::application::GetHealthQuery;
use crate::infrastructure::http::dto::{ApiResponse, HealthResponse};
use crate::infrastructure::http::state::AppState;

/// 检查队列后端与 TTS 引擎
pub async fn health(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthResponse>> {
    let report = state.get_health_handler.handle(GetHealthQuery).await;

    if !report.is_healthy() {
        tracing::warn!(
            queue = report.queue_ok,
            tts = report.tts_ok,
            queue_error = ?report.queue_error,
            "Health check degraded"
        );
    }

    Json(ApiResponse::success(HealthResponse {
        status: if report.is_healthy() { "ok" } else { "degraded" },
        queue: report.queue_ok,
        queue_error: report.queue_error,
        tts: report.tts_ok,
    }))
}

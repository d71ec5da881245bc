//! HTTP Routes
//!
//! API Endpoints:
//! - /api/ping                    GET   存活探针
//! - /api/health                  GET   队列与 TTS 引擎健康检查
//! - /api/task/submit             POST  提交任务到任务队列
//! - /api/task/status/{task_id}   GET   查询任务状态记录

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new().nest("/api", api_routes())
}

/// API 路由
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .route("/health", get(handlers::health))
        .nest("/task", task_routes())
}

/// Task 路由
fn task_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/submit", post(handlers::submit_task))
        .route("/status/:task_id", get(handlers::task_status))
}

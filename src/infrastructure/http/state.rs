//! Application State
//!
//! 运维接口用到的 Command/Query Handlers

use std::sync::Arc;

use crate::application::{
    GetHealthHandler, GetTaskStatusHandler, JobQueuePort, SubmitJobHandler, TtsEnginePort,
};

/// 应用状态
pub struct AppState {
    // ========== Command Handlers ==========
    pub submit_job_handler: SubmitJobHandler,

    // ========== Query Handlers ==========
    pub get_task_status_handler: GetTaskStatusHandler,
    pub get_health_handler: GetHealthHandler,
}

impl AppState {
    /// 创建应用状态
    pub fn new(queue: Arc<dyn JobQueuePort>, tts_engine: Arc<dyn TtsEnginePort>) -> Self {
        Self {
            submit_job_handler: SubmitJobHandler::new(queue.clone()),
            get_task_status_handler: GetTaskStatusHandler::new(queue.clone()),
            get_health_handler: GetHealthHandler::new(queue, tts_engine),
        }
    }
}

//! Job Commands - 任务相关命令

use crate::domain::TtsJob;

/// 处理一个从队列弹出的任务
#[derive(Debug, Clone)]
pub struct ProcessJobCommand {
    /// 队列中的原始字节
    pub payload: Vec<u8>,
}

/// 失败发生的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Validation,
    Download,
    Inference,
    Upload,
    Internal,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::Validation => "validation",
            FailureStage::Download => "download",
            FailureStage::Inference => "inference",
            FailureStage::Upload => "upload",
            FailureStage::Internal => "internal",
        }
    }
}

/// 单个任务的处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// 无法定位任务（无法解析 / 无 taskId），未写回任何记录
    Skipped { reason: String },
    Succeeded {
        task_id: String,
        object_key: String,
        file_url: String,
    },
    Failed {
        task_id: String,
        stage: FailureStage,
        message: String,
    },
}

/// 提交任务到队列
#[derive(Debug, Clone)]
pub struct SubmitJobCommand {
    pub job: TtsJob,
}

#[derive(Debug, Clone)]
pub struct SubmitJobResponse {
    pub task_id: String,
}

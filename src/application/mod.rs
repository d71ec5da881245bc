//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（JobQueue、AudioFetcher、TtsEngine、AudioEncoder、ObjectStorage）
//! - commands: 处理 / 提交任务
//! - queries: 任务状态与健康检查
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod ports;
pub mod queries;

// Re-exports
pub use commands::{
    handlers::{ProcessJobHandler, ProcessJobSettings, SubmitJobHandler},
    FailureStage, JobOutcome, ProcessJobCommand, SubmitJobCommand, SubmitJobResponse,
};

pub use error::ApplicationError;

pub use ports::{
    AudioEncoderPort, AudioFetcherPort, AudioInfo, EncodeError, EncodedAudio, FetchError,
    InferParams, InferRequest, InferResponse, JobQueuePort, ObjectStoragePort, QueueError,
    ReferenceAudio, StorageError, SynthesizedAudio, TtsEnginePort, TtsError,
};

pub use queries::{
    handlers::{GetHealthHandler, GetTaskStatusHandler},
    GetHealthQuery, GetTaskStatusQuery, GetTaskStatusResponse, HealthReport,
};

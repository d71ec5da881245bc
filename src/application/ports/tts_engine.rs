//! TTS Engine Port - TTS 推理引擎抽象
//!
//! 定义 TTS 推理的抽象接口，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::AudioFormat;

/// TTS 错误
#[derive(Debug, Error)]
pub enum TtsError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// 引擎返回了 error 结果
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
}

/// 参考音频
#[derive(Debug, Clone)]
pub struct ReferenceAudio {
    /// 参考音频原始字节
    pub audio: Vec<u8>,
    /// 参考音频对应文本
    pub text: String,
}

/// 推理参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferParams {
    pub max_new_tokens: u32,
    pub chunk_length: u32,
    pub top_p: f32,
    pub repetition_penalty: f32,
    pub temperature: f32,
    pub seed: Option<u64>,
    /// "on" / "off"
    pub use_memory_cache: String,
    pub normalize: bool,
}

impl Default for InferParams {
    fn default() -> Self {
        Self {
            max_new_tokens: 1024,
            chunk_length: 200,
            top_p: 0.7,
            repetition_penalty: 1.2,
            temperature: 0.7,
            seed: None,
            use_memory_cache: "off".to_string(),
            normalize: true,
        }
    }
}

/// TTS 推理请求
#[derive(Debug, Clone)]
pub struct InferRequest {
    /// 要合成的文本内容
    pub text: String,
    pub references: Vec<ReferenceAudio>,
    pub params: InferParams,
    /// 期望的输出格式
    pub format: AudioFormat,
}

/// 合成结果
#[derive(Debug, Clone)]
pub enum SynthesizedAudio {
    /// 引擎已按请求格式编码
    Encoded { data: Vec<u8>, format: AudioFormat },
    /// 原始采样，由 worker 负责编码
    Pcm {
        sample_rate: u32,
        channels: u16,
        samples: Vec<f32>,
    },
}

impl SynthesizedAudio {
    pub fn is_empty(&self) -> bool {
        match self {
            SynthesizedAudio::Encoded { data, .. } => data.is_empty(),
            SynthesizedAudio::Pcm { samples, .. } => samples.is_empty(),
        }
    }
}

/// TTS 推理响应
#[derive(Debug, Clone)]
pub struct InferResponse {
    pub audio: SynthesizedAudio,
    /// 音频时长（毫秒）
    pub duration_ms: Option<u64>,
    /// 采样率
    pub sample_rate: Option<u32>,
}

/// TTS Engine Port
///
/// 外部 TTS 推理组件的抽象接口
#[async_trait]
pub trait TtsEnginePort: Send + Sync {
    /// 执行 TTS 推理
    async fn infer(&self, request: InferRequest) -> Result<InferResponse, TtsError>;

    /// 检查 TTS 服务是否可用
    async fn health_check(&self) -> bool {
        true // 默认实现
    }
}

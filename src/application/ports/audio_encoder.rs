//! Audio Encoder Port - 合成结果编码抽象
//!
//! 引擎返回原始采样时，由编码器封装成目标格式；已编码的数据原样透传

use thiserror::Error;

use crate::domain::AudioFormat;

use super::tts_engine::SynthesizedAudio;

/// 编码错误
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(AudioFormat),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Format mismatch: engine returned {actual}, expected {expected}")]
    FormatMismatch {
        expected: AudioFormat,
        actual: AudioFormat,
    },
}

/// 编码后的音频
#[derive(Debug, Clone)]
pub struct EncodedAudio {
    pub data: Vec<u8>,
    pub format: AudioFormat,
    /// 时长（毫秒），无法得知时为 None
    pub duration_ms: Option<u64>,
}

/// 音频信息
#[derive(Debug, Clone, PartialEq)]
pub struct AudioInfo {
    /// 时长（毫秒）
    pub duration_ms: u64,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    /// 数据大小（字节）
    pub data_size: usize,
}

pub trait AudioEncoderPort: Send + Sync {
    /// 把合成结果编码为 `format`
    fn encode(
        &self,
        audio: SynthesizedAudio,
        format: AudioFormat,
    ) -> Result<EncodedAudio, EncodeError>;

    /// 检查是否支持把 PCM 编码为指定格式
    fn supports_format(&self, format: AudioFormat) -> bool;
}

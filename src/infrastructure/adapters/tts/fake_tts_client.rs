//! Fake TTS Client - 用于测试的 TTS 客户端
//!
//! 不调用推理服务，按文本长度生成一段正弦音 PCM

use async_trait::async_trait;

use crate::application::ports::{
    InferRequest, InferResponse, SynthesizedAudio, TtsEnginePort, TtsError,
};

/// Fake TTS Client 配置
#[derive(Debug, Clone)]
pub struct FakeTtsClientConfig {
    /// 采样率
    pub sample_rate: u32,
    /// 每个字符对应的时长（毫秒）
    pub ms_per_char: u64,
    /// 模拟推理延迟（毫秒）
    pub latency_ms: u64,
    /// 音调频率（Hz）
    pub frequency: f32,
}

impl Default for FakeTtsClientConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            ms_per_char: 50,
            latency_ms: 200,
            frequency: 440.0,
        }
    }
}

/// Fake TTS Client
pub struct FakeTtsClient {
    config: FakeTtsClientConfig,
}

impl FakeTtsClient {
    pub fn new(config: FakeTtsClientConfig) -> Self {
        tracing::info!(
            sample_rate = config.sample_rate,
            ms_per_char = config.ms_per_char,
            "FakeTtsClient initialized"
        );
        Self { config }
    }

    fn tone(&self, duration_ms: u64) -> Vec<f32> {
        let rate = self.config.sample_rate as f32;
        let count = (self.config.sample_rate as u64 * duration_ms / 1000) as usize;
        (0..count)
            .map(|i| {
                (i as f32 * self.config.frequency * 2.0 * std::f32::consts::PI / rate).sin() * 0.3
            })
            .collect()
    }
}

#[async_trait]
impl TtsEnginePort for FakeTtsClient {
    async fn infer(&self, request: InferRequest) -> Result<InferResponse, TtsError> {
        let chars = request.text.chars().count() as u64;
        if chars == 0 {
            return Err(TtsError::InferenceFailed("empty text".to_string()));
        }

        tracing::debug!(
            text_len = chars,
            references = request.references.len(),
            "FakeTtsClient: generating tone"
        );

        if self.config.latency_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.config.latency_ms)).await;
        }

        let duration_ms = chars * self.config.ms_per_char;
        Ok(InferResponse {
            audio: SynthesizedAudio::Pcm {
                sample_rate: self.config.sample_rate,
                channels: 1,
                samples: self.tone(duration_ms),
            },
            duration_ms: Some(duration_ms),
            sample_rate: Some(self.config.sample_rate),
        })
    }

    async fn health_check(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::InferParams;
    use crate::domain::AudioFormat;

    fn request(text: &str) -> InferRequest {
        InferRequest {
            text: text.to_string(),
            references: Vec::new(),
            params: InferParams::default(),
            format: AudioFormat::Wav,
        }
    }

    #[tokio::test]
    async fn test_duration_follows_text_length() {
        let client = FakeTtsClient::new(FakeTtsClientConfig {
            sample_rate: 16000,
            ms_per_char: 100,
            latency_ms: 0,
            ..Default::default()
        });

        let response = client.infer(request("四个字符")).await.unwrap();
        assert_eq!(response.duration_ms, Some(400));
        let SynthesizedAudio::Pcm { samples, .. } = response.audio else {
            panic!("expected pcm");
        };
        assert_eq!(samples.len(), 6400);
    }

    #[tokio::test]
    async fn test_empty_text_fails() {
        let client = FakeTtsClient::new(FakeTtsClientConfig {
            latency_ms: 0,
            ..Default::default()
        });
        assert!(client.infer(request("")).await.is_err());
    }
}

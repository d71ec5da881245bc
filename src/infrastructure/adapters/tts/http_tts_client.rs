//! HTTP TTS Client - 调用外部 TTS 推理服务
//!
//! 实现 TtsEnginePort trait，通过 HTTP 调用外部推理服务
//!
//! 外部 TTS API:
//! POST {base_url}/v1/tts
//! Request: {"text": "...", "references": [{"audio": "<base64>", "text": "..."}], ...}  (JSON)
//! Response: 请求格式的音频二进制，元数据在 headers 中

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::application::ports::{
    InferRequest, InferResponse, SynthesizedAudio, TtsEnginePort, TtsError,
};

/// 参考音频（JSON）
#[derive(Debug, Serialize)]
struct TtsHttpReference {
    /// base64 编码的参考音频
    audio: String,
    text: String,
}

/// TTS 推理请求体 (JSON)
#[derive(Debug, Serialize)]
struct TtsHttpRequest<'a> {
    text: &'a str,
    references: Vec<TtsHttpReference>,
    format: String,
    chunk_length: u32,
    max_new_tokens: u32,
    top_p: f32,
    repetition_penalty: f32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    use_memory_cache: &'a str,
    normalize: bool,
    streaming: bool,
}

impl<'a> TtsHttpRequest<'a> {
    fn from_request(request: &'a InferRequest) -> Self {
        let engine = base64::engine::general_purpose::STANDARD;
        Self {
            text: &request.text,
            references: request
                .references
                .iter()
                .map(|r| TtsHttpReference {
                    audio: engine.encode(&r.audio),
                    text: r.text.clone(),
                })
                .collect(),
            format: request.format.to_string(),
            chunk_length: request.params.chunk_length,
            max_new_tokens: request.params.max_new_tokens,
            top_p: request.params.top_p,
            repetition_penalty: request.params.repetition_penalty,
            temperature: request.params.temperature,
            seed: request.params.seed,
            use_memory_cache: &request.params.use_memory_cache,
            normalize: request.params.normalize,
            streaming: false,
        }
    }
}

/// HTTP TTS 客户端配置
#[derive(Debug, Clone)]
pub struct HttpTtsClientConfig {
    /// TTS 服务基础 URL
    pub base_url: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for HttpTtsClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: 300,
        }
    }
}

impl HttpTtsClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// HTTP TTS 客户端
pub struct HttpTtsClient {
    client: Client,
    config: HttpTtsClientConfig,
}

impl HttpTtsClient {
    /// 创建新的 HTTP TTS 客户端
    pub fn new(config: HttpTtsClientConfig) -> Result<Self, TtsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TtsError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// 获取推理 URL
    fn infer_url(&self) -> String {
        format!("{}/v1/tts", self.config.base_url.trim_end_matches('/'))
    }

    /// 获取健康检查 URL
    fn health_url(&self) -> String {
        format!("{}/v1/health", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl TtsEnginePort for HttpTtsClient {
    async fn infer(&self, request: InferRequest) -> Result<InferResponse, TtsError> {
        let http_request = TtsHttpRequest::from_request(&request);

        tracing::debug!(
            url = %self.infer_url(),
            text_len = request.text.len(),
            references = http_request.references.len(),
            format = %request.format,
            "Sending TTS infer request"
        );

        let response = self
            .client
            .post(self.infer_url())
            .json(&http_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TtsError::Timeout
                } else if e.is_connect() {
                    TtsError::NetworkError(format!("Cannot connect to TTS service: {}", e))
                } else {
                    TtsError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TtsError::ServiceError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        // 从 headers 提取元数据
        let headers = response.headers();
        let duration_ms = headers
            .get("X-TTS-Duration-Ms")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let sample_rate = headers
            .get("X-TTS-Sample-Rate")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());

        let data = response
            .bytes()
            .await
            .map_err(|e| TtsError::InvalidResponse(format!("Failed to read audio: {}", e)))?
            .to_vec();

        if data.is_empty() {
            return Err(TtsError::InvalidResponse("Empty audio body".to_string()));
        }

        tracing::info!(
            duration_ms = ?duration_ms,
            sample_rate = ?sample_rate,
            audio_size = data.len(),
            "TTS inference completed"
        );

        Ok(InferResponse {
            audio: SynthesizedAudio::Encoded {
                data,
                format: request.format,
            },
            duration_ms,
            sample_rate,
        })
    }

    async fn health_check(&self) -> bool {
        match self
            .client
            .get(self.health_url())
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{InferParams, ReferenceAudio};
    use crate::domain::AudioFormat;

    #[test]
    fn test_config_builder() {
        let config = HttpTtsClientConfig::new("http://example.com:9000/").with_timeout(60);
        assert_eq!(config.timeout_secs, 60);

        let client = HttpTtsClient::new(config).unwrap();
        assert_eq!(client.infer_url(), "http://example.com:9000/v1/tts");
        assert_eq!(client.health_url(), "http://example.com:9000/v1/health");
    }

    #[test]
    fn test_request_body() {
        let request = InferRequest {
            text: "你好".to_string(),
            references: vec![ReferenceAudio {
                audio: b"abc".to_vec(),
                text: "ref".to_string(),
            }],
            params: InferParams::default(),
            format: AudioFormat::Wav,
        };

        let body = serde_json::to_value(TtsHttpRequest::from_request(&request)).unwrap();
        assert_eq!(body["text"], "你好");
        assert_eq!(body["references"][0]["audio"], "YWJj");
        assert_eq!(body["references"][0]["text"], "ref");
        assert_eq!(body["format"], "wav");
        assert_eq!(body["chunk_length"], 200);
        assert_eq!(body["max_new_tokens"], 1024);
        assert_eq!(body["use_memory_cache"], "off");
        assert_eq!(body["streaming"], false);
        assert!(body.get("seed").is_none());
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unhealthy() {
        let client = HttpTtsClient::new(HttpTtsClientConfig::new("http://127.0.0.1:1")).unwrap();
        assert!(!client.health_check().await);
    }
}

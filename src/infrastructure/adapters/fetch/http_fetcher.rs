//! HTTP Audio Fetcher - 通过 HTTP 下载参考音频
//!
//! 实现 AudioFetcherPort trait

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use std::time::Duration;

use crate::application::ports::{AudioFetcherPort, FetchError};

/// 下载器配置
#[derive(Debug, Clone)]
pub struct HttpAudioFetcherConfig {
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
    /// 最大下载大小（字节）
    pub max_bytes: u64,
}

impl Default for HttpAudioFetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_bytes: 50 * 1024 * 1024,
        }
    }
}

/// HTTP 参考音频下载器
pub struct HttpAudioFetcher {
    client: Client,
    config: HttpAudioFetcherConfig,
}

impl HttpAudioFetcher {
    pub fn new(config: HttpAudioFetcherConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self { client, config })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(e.to_string())
    }
}

#[async_trait]
impl AudioFetcherPort for HttpAudioFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let parsed = reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl(format!(
                "unsupported scheme: {}",
                parsed.scheme()
            )));
        }

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let limit = self.config.max_bytes;
        if let Some(size) = response.content_length() {
            if size > limit {
                return Err(FetchError::TooLarge { size, limit });
            }
        }

        // 边下载边检查大小，Content-Length 缺失时也不会无限读取
        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let size = (body.len() + chunk.len()) as u64;
            if size > limit {
                return Err(FetchError::TooLarge { size, limit });
            }
            body.extend_from_slice(&chunk);
        }

        if body.is_empty() {
            return Err(FetchError::Empty);
        }

        tracing::debug!(url = %url, size = body.len(), "Reference audio downloaded");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_invalid_url() {
        let fetcher = HttpAudioFetcher::new(HttpAudioFetcherConfig::default()).unwrap();
        let err = fetcher.fetch("not-a-url").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_rejects_non_http_scheme() {
        let fetcher = HttpAudioFetcher::new(HttpAudioFetcherConfig::default()).unwrap();
        let err = fetcher.fetch("file:///etc/passwd").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let fetcher = HttpAudioFetcher::new(HttpAudioFetcherConfig {
            timeout_secs: 2,
            ..Default::default()
        })
        .unwrap();
        let err = fetcher.fetch("http://127.0.0.1:1/ref.wav").await.unwrap_err();
        assert!(matches!(err, FetchError::Network(_) | FetchError::Timeout));
    }
}

//! Audio Fetcher Port - 下载参考音频

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout")]
    Timeout,

    #[error("HTTP status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Response too large: {size} bytes exceeds {limit}")]
    TooLarge { size: u64, limit: u64 },

    #[error("Empty response body")]
    Empty,
}

#[async_trait]
pub trait AudioFetcherPort: Send + Sync {
    /// 下载 URL 指向的全部字节
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

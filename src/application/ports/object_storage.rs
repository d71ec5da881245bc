//! Object Storage Port - 出站端口
//!
//! 合成结果上传到对象存储（COS 或本地目录）

use async_trait::async_trait;
use thiserror::Error;

/// 对象存储错误
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Upload rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("IO error: {0}")]
    Io(String),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),
}

#[async_trait]
pub trait ObjectStoragePort: Send + Sync {
    /// 上传对象，同 key 覆盖
    async fn put_object(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// 对象的访问 URL
    fn object_url(&self, key: &str) -> String;
}

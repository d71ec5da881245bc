//! Local Storage - 本地目录对象存储
//!
//! 实现 ObjectStoragePort trait，用于开发环境和无 COS 部署

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use crate::application::ports::{ObjectStoragePort, StorageError};

/// 本地目录对象存储
pub struct LocalObjectStorage {
    /// 存储根目录
    base_dir: PathBuf,
    /// 对外访问 Base URL
    public_base_url: String,
}

impl LocalObjectStorage {
    /// 创建新的本地存储
    pub async fn new(
        base_dir: impl AsRef<Path>,
        public_base_url: impl Into<String>,
    ) -> Result<Self, StorageError> {
        let base_dir = base_dir.as_ref().to_path_buf();

        // 确保目录存在
        fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(Self {
            base_dir,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// 对象 key 对应的本地路径
    pub fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key.trim_start_matches('/'));
        let valid = relative.as_os_str().len() > 0
            && relative.components().all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.base_dir.join(relative))
    }
}

#[async_trait]
impl ObjectStoragePort for LocalObjectStorage {
    async fn put_object(
        &self,
        key: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), StorageError> {
        let path = self.object_path(key)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Io(e.to_string()))?;
        }

        fs::write(&path, &data)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;

        tracing::debug!(key = %key, path = ?path, size = data.len(), "Saved object");

        Ok(())
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key.trim_start_matches('/'))
    }
}

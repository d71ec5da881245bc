//! 应用层错误定义
//!
//! 统一的命令/查询错误类型

use thiserror::Error;

use crate::application::ports::{EncodeError, FetchError, QueueError, StorageError, TtsError};
use crate::domain::JobError;

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 资源未找到
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 队列错误
    #[error("Queue error: {0}")]
    QueueError(String),

    /// 外部服务错误
    #[error("External service error: {0}")]
    ExternalServiceError(String),

    /// 存储错误
    #[error("Storage error: {0}")]
    StorageError(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApplicationError {
    /// 创建 NotFound 错误
    pub fn not_found(resource_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type,
            id: id.into(),
        }
    }

    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }
}

impl From<QueueError> for ApplicationError {
    fn from(err: QueueError) -> Self {
        Self::QueueError(err.to_string())
    }
}

impl From<JobError> for ApplicationError {
    fn from(err: JobError) -> Self {
        Self::ValidationError(err.to_string())
    }
}

impl From<FetchError> for ApplicationError {
    fn from(err: FetchError) -> Self {
        Self::ExternalServiceError(err.to_string())
    }
}

impl From<TtsError> for ApplicationError {
    fn from(err: TtsError) -> Self {
        Self::ExternalServiceError(err.to_string())
    }
}

impl From<StorageError> for ApplicationError {
    fn from(err: StorageError) -> Self {
        Self::StorageError(err.to_string())
    }
}

impl From<EncodeError> for ApplicationError {
    fn from(err: EncodeError) -> Self {
        Self::InternalError(err.to_string())
    }
}

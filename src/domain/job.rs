//! TTS Job - 队列中的合成任务描述

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// 任务解析 / 校验错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("Payload is not valid UTF-8: {0}")]
    Encoding(String),

    #[error("Malformed job payload: {0}")]
    Malformed(String),

    #[error("Job has no taskId")]
    MissingTaskId,

    #[error("Job {task_id} is missing field: {field}")]
    MissingField {
        task_id: String,
        field: &'static str,
    },
}

/// 队列中的原始任务记录
///
/// 所有字段在解析阶段都是可选的，缺失的 key 读作 `None`。
/// `taskId` / `personId` 为数字时转成十进制字符串（`123` 读作 `"123"`），
/// 状态 key 与结果记录中的 `taskId` 因此总是字符串。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsJob {
    /// 参考音频的下载地址
    #[serde(default)]
    pub audio_file_url: Option<String>,

    /// 参考音频对应的文本
    #[serde(default)]
    pub audio_text: Option<String>,

    #[serde(default, deserialize_with = "string_or_number")]
    pub person_id: Option<String>,

    #[serde(default, deserialize_with = "string_or_number")]
    pub task_id: Option<String>,

    /// 要合成的文本
    #[serde(default)]
    pub content: Option<String>,
}

/// 校验后的任务，所有必填字段都已存在
#[derive(Debug, Clone, PartialEq)]
pub struct ValidJob {
    pub task_id: String,
    pub person_id: String,
    pub audio_file_url: String,
    pub audio_text: String,
    pub content: String,
}

impl TtsJob {
    /// 从队列弹出的字节解析任务
    pub fn from_payload(payload: &[u8]) -> Result<Self, JobError> {
        let text =
            std::str::from_utf8(payload).map_err(|e| JobError::Encoding(e.to_string()))?;
        serde_json::from_str(text).map_err(|e| JobError::Malformed(e.to_string()))
    }

    /// 校验必填字段
    pub fn validate(&self) -> Result<ValidJob, JobError> {
        // taskId 原样保留，状态 key 与上游写入的保持一致
        let task_id = self
            .task_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .ok_or(JobError::MissingTaskId)?;

        let audio_file_url =
            non_blank(&self.audio_file_url).ok_or_else(|| JobError::MissingField {
                task_id: task_id.clone(),
                field: "audioFileUrl",
            })?;

        let content = non_blank(&self.content).ok_or_else(|| JobError::MissingField {
            task_id: task_id.clone(),
            field: "content",
        })?;

        Ok(ValidJob {
            task_id,
            person_id: self.person_id.clone().unwrap_or_default(),
            audio_file_url,
            audio_text: self.audio_text.clone().unwrap_or_default(),
            content,
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// personId / taskId 在上游既可能是字符串也可能是数字
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

//! 任务状态 / 结果记录
//!
//! 两种写回格式：
//! - `StatusRecord`: 写入 `{status_key_prefix}{task_id}`，`{"code", "msg", "value"?}`
//! - `TaskResult`: 推入结果队列，`{"code", "msg", "taskId", "fileUrl"}`

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 状态码表
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetCode {
    Ok,
    Fail,
    ErrorParam,
    NotExist,
    WechatError,
    WechatReturnFail,
}

impl RetCode {
    pub fn as_i64(&self) -> i64 {
        match self {
            RetCode::Ok => 0,
            RetCode::Fail => 1,
            RetCode::ErrorParam => 2,
            RetCode::NotExist => 3,
            RetCode::WechatError => 105001,
            RetCode::WechatReturnFail => 105002,
        }
    }
}

/// 状态记录，`value` 为空时不序列化
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub code: i64,
    pub msg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Default for StatusRecord {
    fn default() -> Self {
        Self {
            code: RetCode::Ok.as_i64(),
            msg: String::new(),
            value: None,
        }
    }
}

impl StatusRecord {
    /// 成功记录，附带数据
    pub fn ok(value: Value) -> Self {
        Self {
            value: Some(value),
            ..Default::default()
        }
    }

    /// 失败记录
    pub fn fail(code: RetCode, msg: impl Into<String>) -> Self {
        Self {
            code: code.as_i64(),
            msg: msg.into(),
            value: None,
        }
    }

    /// 上传成功后写入的 `{"fileKey": url}`
    pub fn uploaded(file_url: &str) -> Self {
        Self::ok(serde_json::json!({ "fileKey": file_url }))
    }

    pub fn is_ok(&self) -> bool {
        self.code == RetCode::Ok.as_i64()
    }

    pub fn to_json(&self) -> String {
        // 只包含 String/i64/Value，序列化不会失败
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

/// 推入结果队列的任务结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    pub code: i64,
    pub msg: String,
    pub task_id: Option<String>,
    pub file_url: Option<String>,
}

impl TaskResult {
    pub fn success(task_id: impl Into<String>, file_url: impl Into<String>) -> Self {
        Self {
            code: RetCode::Ok.as_i64(),
            msg: "success".to_string(),
            task_id: Some(task_id.into()),
            file_url: Some(file_url.into()),
        }
    }

    pub fn failure(task_id: Option<String>, msg: impl Into<String>) -> Self {
        Self {
            code: RetCode::Fail.as_i64(),
            msg: msg.into(),
            task_id,
            file_url: None,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_without_value_omits_key() {
        let record = StatusRecord::fail(RetCode::Fail, "boom");
        assert_eq!(record.to_json(), r#"{"code":1,"msg":"boom"}"#);
    }

    #[test]
    fn test_uploaded_status_carries_file_key() {
        let record = StatusRecord::uploaded("https://b.cos.r.myqcloud.com/a.wav");
        let json: Value = serde_json::from_str(&record.to_json()).unwrap();
        assert_eq!(json["code"], 0);
        assert_eq!(json["msg"], "");
        assert_eq!(json["value"]["fileKey"], "https://b.cos.r.myqcloud.com/a.wav");
        assert!(record.is_ok());
    }

    #[test]
    fn test_task_result_keeps_null_keys() {
        let result = TaskResult::failure(Some("t-1".to_string()), "failed");
        let json: Value = serde_json::from_str(&result.to_json()).unwrap();
        assert_eq!(json["code"], 1);
        assert_eq!(json["taskId"], "t-1");
        assert!(json.as_object().unwrap().contains_key("fileUrl"));
        assert!(json["fileUrl"].is_null());
    }

    #[test]
    fn test_task_result_success() {
        let result = TaskResult::success("t-2", "https://host/x.wav");
        assert_eq!(result.code, 0);
        assert_eq!(result.msg, "success");
        assert_eq!(result.file_url.as_deref(), Some("https://host/x.wav"));
    }

    #[test]
    fn test_ret_code_table() {
        assert_eq!(RetCode::ErrorParam.as_i64(), 2);
        assert_eq!(RetCode::WechatReturnFail.as_i64(), 105002);
    }
}

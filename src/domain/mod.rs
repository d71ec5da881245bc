//! Domain Layer - 领域层
//!
//! - job: 队列任务记录及校验
//! - report: 状态 / 结果写回记录
//! - object_key: 结果文件命名
//! - audio_format: 输出音频格式

mod audio_format;
mod job;
mod object_key;
mod report;

pub use audio_format::{AudioFormat, UnsupportedFormat};
pub use job::{JobError, TtsJob, ValidJob};
pub use object_key::{result_object_key, DEFAULT_RESULT_PREFIX};
pub use report::{RetCode, StatusRecord, TaskResult};

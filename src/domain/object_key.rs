//! 结果音频在对象存储中的 key

use chrono::{DateTime, TimeZone};

use super::audio_format::AudioFormat;

/// 默认的结果目录
pub const DEFAULT_RESULT_PREFIX: &str = "/TTS/TASK_RESULT";

/// 生成结果文件 key: `{prefix}/{YYYYMMDDHHMM}_{person_id}_{task_id}.{ext}`
///
/// 时间只保留到分钟，同一 person/task 在同一分钟内重复生成会覆盖。
pub fn result_object_key<Tz>(
    prefix: &str,
    now: &DateTime<Tz>,
    person_id: &str,
    task_id: &str,
    format: AudioFormat,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{}/{}_{}_{}.{}",
        prefix.trim_end_matches('/'),
        now.format("%Y%m%d%H%M"),
        person_id,
        task_id,
        format.extension()
    )
}

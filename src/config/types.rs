//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;

use crate::application::ports::InferParams;
use crate::domain::{AudioFormat, DEFAULT_RESULT_PREFIX};

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Redis 连接配置
    #[serde(default)]
    pub redis: RedisConfig,

    /// 队列与状态 key 配置
    #[serde(default)]
    pub queue: QueueConfig,

    /// 腾讯云 COS 配置
    #[serde(default)]
    pub cos: CosConfig,

    /// 结果存储配置
    #[serde(default)]
    pub storage: StorageConfig,

    /// TTS 引擎配置
    #[serde(default)]
    pub tts: TtsConfig,

    /// 参考音频下载配置
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Worker 配置
    #[serde(default)]
    pub worker: WorkerConfig,

    /// 运维 HTTP 接口配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// Redis 连接配置
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_host")]
    pub host: String,

    #[serde(default = "default_redis_port")]
    pub port: u16,

    #[serde(default)]
    pub db: i64,

    #[serde(default)]
    pub password: Option<String>,
}

fn default_redis_host() -> String {
    "127.0.0.1".to_string()
}

fn default_redis_port() -> u16 {
    6379
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: default_redis_host(),
            port: default_redis_port(),
            db: 0,
            password: None,
        }
    }
}

impl RedisConfig {
    /// 获取 Redis 连接 URL
    pub fn url(&self) -> String {
        match self.password.as_deref().filter(|p| !p.is_empty()) {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                encode_userinfo(password),
                self.host,
                self.port,
                self.db
            ),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }

    /// 不含密码的连接描述（用于日志）
    pub fn display_addr(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.db)
    }
}

fn encode_userinfo(value: &str) -> String {
    percent_encoding::utf8_percent_encode(value, percent_encoding::NON_ALPHANUMERIC).to_string()
}

/// 队列后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueueBackend {
    #[default]
    Redis,
    /// 进程内队列，仅用于本地调试
    Memory,
}

/// 队列与状态 key 配置
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    #[serde(default)]
    pub backend: QueueBackend,

    /// 任务队列
    #[serde(default = "default_task_queue")]
    pub task_queue: String,

    /// 结果队列，为空时不推送结果
    #[serde(default = "default_result_queue")]
    pub result_queue: Option<String>,

    /// 状态 key 前缀，完整 key 为 `{prefix}{task_id}`
    #[serde(default = "default_status_key_prefix")]
    pub status_key_prefix: String,

    /// 状态记录过期时间（秒），0 表示不过期
    #[serde(default)]
    pub status_ttl_secs: u64,

    /// 单次阻塞弹出的超时时间（秒），0 表示无限等待
    #[serde(default = "default_pop_timeout")]
    pub pop_timeout_secs: u64,
}

fn default_task_queue() -> String {
    "VVS:TTS:TaskQueue".to_string()
}

fn default_result_queue() -> Option<String> {
    Some("VVS:GPU_TASK_RESULT_QUEUE".to_string())
}

fn default_status_key_prefix() -> String {
    "TTS:task_result:".to_string()
}

fn default_pop_timeout() -> u64 {
    5
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            backend: QueueBackend::default(),
            task_queue: default_task_queue(),
            result_queue: default_result_queue(),
            status_key_prefix: default_status_key_prefix(),
            status_ttl_secs: 0,
            pop_timeout_secs: default_pop_timeout(),
        }
    }
}

impl QueueConfig {
    /// 过滤掉空字符串的结果队列
    pub fn result_queue(&self) -> Option<&str> {
        self.result_queue.as_deref().filter(|q| !q.is_empty())
    }
}

/// 腾讯云 COS 配置
#[derive(Debug, Clone, Deserialize)]
pub struct CosConfig {
    #[serde(default)]
    pub bucket: String,

    #[serde(default)]
    pub region: String,

    #[serde(default)]
    pub secret_id: String,

    #[serde(default)]
    pub secret_key: String,

    /// 自定义访问域名，为空时使用 `{bucket}.cos.{region}.myqcloud.com`
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_cos_scheme")]
    pub scheme: String,

    /// 是否附带 Content-MD5
    #[serde(default)]
    pub enable_md5: bool,

    /// 签名有效期（秒）
    #[serde(default = "default_sign_expire")]
    pub sign_expire_secs: u64,

    /// 上传超时时间（秒）
    #[serde(default = "default_upload_timeout")]
    pub timeout_secs: u64,
}

fn default_cos_scheme() -> String {
    "https".to_string()
}

fn default_sign_expire() -> u64 {
    600
}

fn default_upload_timeout() -> u64 {
    60
}

impl Default for CosConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: String::new(),
            secret_id: String::new(),
            secret_key: String::new(),
            endpoint: None,
            scheme: default_cos_scheme(),
            enable_md5: false,
            sign_expire_secs: default_sign_expire(),
            timeout_secs: default_upload_timeout(),
        }
    }
}

/// 存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Cos,
    /// 写入本地目录
    Local,
}

/// 结果存储配置
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// 结果文件 key 前缀
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// 本地存储目录（backend = local）
    #[serde(default = "default_local_dir")]
    pub local_dir: PathBuf,

    /// 本地存储对外访问的 Base URL（backend = local）
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

fn default_key_prefix() -> String {
    DEFAULT_RESULT_PREFIX.to_string()
}

fn default_local_dir() -> PathBuf {
    PathBuf::from("data/results")
}

fn default_public_base_url() -> String {
    "http://localhost:8080/files".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            key_prefix: default_key_prefix(),
            local_dir: default_local_dir(),
            public_base_url: default_public_base_url(),
        }
    }
}

/// TTS 引擎类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TtsEngineKind {
    #[default]
    Http,
    /// 生成固定音调，测试用
    Fake,
}

/// TTS 引擎配置
#[derive(Debug, Clone, Deserialize)]
pub struct TtsConfig {
    #[serde(default)]
    pub engine: TtsEngineKind,

    /// TTS 服务基础 URL
    #[serde(default = "default_tts_url")]
    pub url: String,

    /// 请求超时时间（秒）
    #[serde(default = "default_tts_timeout")]
    pub timeout_secs: u64,

    /// 输出格式
    #[serde(default)]
    pub format: AudioFormat,

    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,

    #[serde(default = "default_chunk_length")]
    pub chunk_length: u32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_repetition_penalty")]
    pub repetition_penalty: f32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default = "default_memory_cache")]
    pub use_memory_cache: String,

    #[serde(default = "default_normalize")]
    pub normalize: bool,
}

fn default_tts_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_tts_timeout() -> u64 {
    300
}

fn default_max_new_tokens() -> u32 {
    1024
}

fn default_chunk_length() -> u32 {
    200
}

fn default_top_p() -> f32 {
    0.7
}

fn default_repetition_penalty() -> f32 {
    1.2
}

fn default_temperature() -> f32 {
    0.7
}

fn default_memory_cache() -> String {
    "off".to_string()
}

fn default_normalize() -> bool {
    true
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            engine: TtsEngineKind::default(),
            url: default_tts_url(),
            timeout_secs: default_tts_timeout(),
            format: AudioFormat::default(),
            max_new_tokens: default_max_new_tokens(),
            chunk_length: default_chunk_length(),
            top_p: default_top_p(),
            repetition_penalty: default_repetition_penalty(),
            temperature: default_temperature(),
            seed: None,
            use_memory_cache: default_memory_cache(),
            normalize: default_normalize(),
        }
    }
}

impl TtsConfig {
    /// 推理参数
    pub fn infer_params(&self) -> InferParams {
        InferParams {
            max_new_tokens: self.max_new_tokens,
            chunk_length: self.chunk_length,
            top_p: self.top_p,
            repetition_penalty: self.repetition_penalty,
            temperature: self.temperature,
            seed: self.seed,
            use_memory_cache: self.use_memory_cache.clone(),
            normalize: self.normalize,
        }
    }
}

/// 参考音频下载配置
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// 下载超时时间（秒）
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    /// 最大下载大小（字节）
    #[serde(default = "default_fetch_max_bytes")]
    pub max_bytes: u64,
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_fetch_max_bytes() -> u64 {
    50 * 1024 * 1024 // 50 MB
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            max_bytes: default_fetch_max_bytes(),
        }
    }
}

/// Worker 配置
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// 最大并发任务数
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// 队列出错后的等待时间（毫秒）
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

fn default_concurrency() -> usize {
    1
}

fn default_retry_delay() -> u64 {
    1000
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

/// 运维 HTTP 接口配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 是否启用
    #[serde(default)]
    pub enabled: bool,

    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5070
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.redis.port, 6379);
        assert_eq!(config.queue.task_queue, "VVS:TTS:TaskQueue");
        assert_eq!(config.queue.result_queue(), Some("VVS:GPU_TASK_RESULT_QUEUE"));
        assert_eq!(config.queue.status_key_prefix, "TTS:task_result:");
        assert_eq!(config.worker.concurrency, 1);
        assert_eq!(config.tts.format, AudioFormat::Wav);
    }

    #[test]
    fn test_redis_url_without_password() {
        let config = RedisConfig::default();
        assert_eq!(config.url(), "redis://127.0.0.1:6379/0");
    }

    #[test]
    fn test_redis_url_escapes_password() {
        let config = RedisConfig {
            password: Some("p@ss:word".to_string()),
            db: 2,
            ..Default::default()
        };
        assert_eq!(config.url(), "redis://:p%40ss%3Aword@127.0.0.1:6379/2");
        assert_eq!(config.display_addr(), "127.0.0.1:6379/2");
    }

    #[test]
    fn test_empty_result_queue_disables_push() {
        let config = QueueConfig {
            result_queue: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(config.result_queue(), None);
    }

    #[test]
    fn test_infer_params_match_defaults() {
        assert_eq!(TtsConfig::default().infer_params(), InferParams::default());
    }
}

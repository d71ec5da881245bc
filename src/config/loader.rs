//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（process_redis.yaml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::types::{AppConfig, QueueBackend, StorageBackend, TtsEngineKind};

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径（不含扩展名，yaml / yml 均可）
const CONFIG_FILE_NAMES: &[&str] = &["process_redis", "config"];

/// 指定配置文件路径的环境变量
pub const CONFIG_PATH_ENV: &str = "VVS_CONFIG";

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `VVS_`，层级分隔符 `__`）
/// 2. 配置文件（`VVS_CONFIG` 指定的文件，否则搜索 process_redis.yaml / config.yaml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `VVS_REDIS__HOST=10.0.0.5`
/// - `VVS_REDIS__PASSWORD=secret`
/// - `VVS_COS__BUCKET=tts-1250000000`
/// - `VVS_WORKER__CONCURRENCY=2`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
    load_config_from_path(path.as_deref())
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 首先设置默认值（最低优先级）
    builder = builder
        .set_default("redis.host", "127.0.0.1")?
        .set_default("redis.port", 6379)?
        .set_default("redis.db", 0)?
        .set_default("queue.task_queue", "VVS:TTS:TaskQueue")?
        .set_default("queue.status_key_prefix", "TTS:task_result:")?
        .set_default("queue.pop_timeout_secs", 5)?
        .set_default("worker.concurrency", 1)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 添加配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 添加环境变量（最高优先级）
    // 例如: VVS_REDIS__HOST=redis.internal
    builder = builder.add_source(
        Environment::with_prefix("VVS")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.queue.backend == QueueBackend::Redis {
        if config.redis.host.is_empty() {
            return Err(ConfigError::ValidationError(
                "Redis host cannot be empty".to_string(),
            ));
        }
        if config.redis.port == 0 {
            return Err(ConfigError::ValidationError(
                "Redis port cannot be 0".to_string(),
            ));
        }
    }

    if config.queue.task_queue.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "Task queue name cannot be empty".to_string(),
        ));
    }

    if config.queue.pop_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "Queue pop timeout must be at least 1 second".to_string(),
        ));
    }

    if config.storage.backend == StorageBackend::Cos {
        let cos = &config.cos;
        let missing: Vec<&str> = [
            ("cos.bucket", cos.bucket.as_str()),
            ("cos.region", cos.region.as_str()),
            ("cos.secret_id", cos.secret_id.as_str()),
            ("cos.secret_key", cos.secret_key.as_str()),
        ]
        .iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| *name)
        .collect();

        if !missing.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "COS storage requires: {}",
                missing.join(", ")
            )));
        }
    }

    if config.tts.engine == TtsEngineKind::Http && config.tts.url.is_empty() {
        return Err(ConfigError::ValidationError(
            "TTS URL cannot be empty".to_string(),
        ));
    }

    if config.worker.concurrency == 0 {
        return Err(ConfigError::ValidationError(
            "Worker concurrency must be at least 1".to_string(),
        ));
    }

    if config.server.enabled && config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "Server port cannot be 0".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志，不输出密钥）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Worker Configuration ===");
    tracing::info!("Queue Backend: {:?}", config.queue.backend);
    if config.queue.backend == QueueBackend::Redis {
        tracing::info!("Redis: {}", config.redis.display_addr());
    }
    tracing::info!("Task Queue: {}", config.queue.task_queue);
    tracing::info!(
        "Result Queue: {}",
        config.queue.result_queue().unwrap_or("(disabled)")
    );
    tracing::info!("Status Key Prefix: {}", config.queue.status_key_prefix);
    tracing::info!("Storage Backend: {:?}", config.storage.backend);
    match config.storage.backend {
        StorageBackend::Cos => {
            tracing::info!("COS Bucket: {} ({})", config.cos.bucket, config.cos.region)
        }
        StorageBackend::Local => {
            tracing::info!("Local Storage: {:?}", config.storage.local_dir)
        }
    }
    tracing::info!("TTS Engine: {:?} {}", config.tts.engine, config.tts.url);
    tracing::info!("Output Format: {}", config.tts.format);
    tracing::info!("Worker Concurrency: {}", config.worker.concurrency);
    if config.server.enabled {
        tracing::info!("Ops Server: {}", config.server.addr());
    }
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("============================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn cos_ready() -> AppConfig {
        let mut config = AppConfig::default();
        config.cos.bucket = "tts-1250000000".to_string();
        config.cos.region = "ap-guangzhou".to_string();
        config.cos.secret_id = "id".to_string();
        config.cos.secret_key = "key".to_string();
        config
    }

    #[test]
    fn test_validation_passes_for_valid_config() {
        assert!(validate_config(&cos_ready()).is_ok());
    }

    #[test]
    fn test_validation_requires_cos_credentials() {
        let err = validate_config(&AppConfig::default()).unwrap_err();
        assert!(err.to_string().contains("cos.bucket"));
    }

    #[test]
    fn test_local_storage_skips_cos_check() {
        let mut config = AppConfig::default();
        config.storage.backend = StorageBackend::Local;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_zero_concurrency() {
        let mut config = cos_ready();
        config.worker.concurrency = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_pop_timeout() {
        let mut config = cos_ready();
        config.queue.pop_timeout_secs = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("pop timeout"));
    }

    #[test]
    fn test_validation_error_for_empty_queue() {
        let mut config = cos_ready();
        config.queue.task_queue = " ".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            r#"
redis:
  host: 10.0.0.5
  port: 6380
  db: 3
  password: secret
cos:
  bucket: tts-1250000000
  region: ap-shanghai
  secret_id: AKID
  secret_key: KEY
queue:
  task_queue: TTS:TaskQueue
  result_queue: ""
tts:
  format: mp3
  temperature: 0.5
"#
        )
        .unwrap();

        let config = load_config_from_path(Some(file.path())).unwrap();
        assert_eq!(config.redis.host, "10.0.0.5");
        assert_eq!(config.redis.port, 6380);
        assert_eq!(config.redis.db, 3);
        assert_eq!(config.redis.password.as_deref(), Some("secret"));
        assert_eq!(config.cos.region, "ap-shanghai");
        assert_eq!(config.queue.task_queue, "TTS:TaskQueue");
        assert_eq!(config.queue.result_queue(), None);
        assert_eq!(config.tts.format, crate::domain::AudioFormat::Mp3);
        assert_eq!(config.tts.temperature, 0.5);
        assert_eq!(config.tts.top_p, 0.7);
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let result = load_config_from_path(Some(Path::new("/nonexistent/process_redis.yaml")));
        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }
}

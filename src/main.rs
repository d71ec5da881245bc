//! VVS Worker - Redis 队列驱动的 TTS 合成 Worker
//!
//! 从任务队列弹出任务 → 下载参考音频 → TTS 推理 → 上传结果 → 写回状态

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use vvs_worker::application::{
    AudioEncoderPort, JobQueuePort, ObjectStoragePort, ProcessJobHandler, ProcessJobSettings,
    TtsEnginePort,
};
use vvs_worker::config::{
    load_config, print_config, AppConfig, LogConfig, QueueBackend, StorageBackend, TtsEngineKind,
};
use vvs_worker::infrastructure::adapters::{
    CosObjectStorage, CosStorageConfig, FakeTtsClient, FakeTtsClientConfig, HttpAudioFetcher,
    HttpAudioFetcherConfig, HttpTtsClient, HttpTtsClientConfig, LocalObjectStorage, WavEncoder,
};
use vvs_worker::infrastructure::http::{AppState, HttpServer, ServerConfig};
use vvs_worker::infrastructure::{
    InMemoryJobQueue, InMemoryQueueConfig, RedisJobQueue, RedisQueueConfig, TtsWorker,
    TtsWorkerConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config.log);

    tracing::info!("VVS Worker - TTS 任务处理");
    print_config(&config);

    let queue = build_queue(&config).await?;
    let tts_engine = build_tts_engine(&config)?;
    let storage = build_storage(&config).await?;

    let fetcher = Arc::new(HttpAudioFetcher::new(HttpAudioFetcherConfig {
        timeout_secs: config.fetch.timeout_secs,
        max_bytes: config.fetch.max_bytes,
    })?);

    let encoder = Arc::new(WavEncoder::new());
    if !encoder.supports_format(config.tts.format) {
        if config.tts.engine == TtsEngineKind::Fake {
            anyhow::bail!(
                "Fake TTS engine only produces PCM, which cannot be encoded as {}",
                config.tts.format
            );
        }
        tracing::warn!(
            format = %config.tts.format,
            "Output format cannot be encoded locally, the TTS engine must return it encoded"
        );
    }

    let handler = Arc::new(ProcessJobHandler::new(
        queue.clone(),
        fetcher,
        tts_engine.clone(),
        encoder,
        storage,
        ProcessJobSettings {
            params: config.tts.infer_params(),
            format: config.tts.format,
            key_prefix: config.storage.key_prefix.clone(),
        },
    ));

    let shutdown = CancellationToken::new();

    // 启动 Worker
    let worker = TtsWorker::new(
        TtsWorkerConfig {
            concurrency: config.worker.concurrency,
            pop_timeout: Duration::from_secs(config.queue.pop_timeout_secs),
            retry_delay: Duration::from_millis(config.worker.retry_delay_ms),
        },
        queue.clone(),
        handler,
    );
    let worker_handle = tokio::spawn(worker.run(shutdown.clone()));

    // 可选运维接口
    let server_handle = if config.server.enabled {
        let server = HttpServer::new(
            ServerConfig::new(&config.server.host, config.server.port),
            AppState::new(queue.clone(), tts_engine.clone()),
        );
        let token = shutdown.clone();
        Some(tokio::spawn(async move {
            server
                .run_with_shutdown(async move { token.cancelled().await })
                .await
        }))
    } else {
        None
    };

    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received shutdown signal"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for ctrl-c, shutting down"),
    }
    shutdown.cancel();

    worker_handle.await?;
    if let Some(handle) = server_handle {
        handle.await??;
    }

    tracing::info!("Shutdown complete");

    Ok(())
}

/// 初始化日志
fn init_tracing(log: &LogConfig) {
    let log_filter = format!("{},vvs_worker={},tower_http=debug", log.level, log.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if log.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn build_queue(config: &AppConfig) -> anyhow::Result<Arc<dyn JobQueuePort>> {
    let status_ttl = (config.queue.status_ttl_secs > 0)
        .then(|| Duration::from_secs(config.queue.status_ttl_secs));

    match config.queue.backend {
        QueueBackend::Redis => {
            let queue_config = RedisQueueConfig {
                url: config.redis.url(),
                task_queue: config.queue.task_queue.clone(),
                result_queue: config.queue.result_queue().map(str::to_string),
                status_key_prefix: config.queue.status_key_prefix.clone(),
                status_ttl,
            };
            let queue = RedisJobQueue::connect(queue_config).await?;
            tracing::info!(redis = %config.redis.display_addr(), "Connected to Redis");
            Ok(Arc::new(queue))
        }
        QueueBackend::Memory => {
            tracing::warn!("Using in-memory queue, jobs are lost on restart");
            Ok(Arc::new(InMemoryJobQueue::with_config(InMemoryQueueConfig {
                result_queue: config.queue.result_queue().map(str::to_string),
                status_ttl,
                ..Default::default()
            })))
        }
    }
}

fn build_tts_engine(config: &AppConfig) -> anyhow::Result<Arc<dyn TtsEnginePort>> {
    match config.tts.engine {
        TtsEngineKind::Http => {
            let tts_config =
                HttpTtsClientConfig::new(&config.tts.url).with_timeout(config.tts.timeout_secs);
            Ok(Arc::new(HttpTtsClient::new(tts_config)?))
        }
        TtsEngineKind::Fake => Ok(Arc::new(FakeTtsClient::new(FakeTtsClientConfig::default()))),
    }
}

async fn build_storage(config: &AppConfig) -> anyhow::Result<Arc<dyn ObjectStoragePort>> {
    match config.storage.backend {
        StorageBackend::Cos => {
            let cos = &config.cos;
            let storage = CosObjectStorage::new(CosStorageConfig {
                bucket: cos.bucket.clone(),
                region: cos.region.clone(),
                secret_id: cos.secret_id.clone(),
                secret_key: cos.secret_key.clone(),
                endpoint: cos.endpoint.clone(),
                scheme: cos.scheme.clone(),
                enable_md5: cos.enable_md5,
                sign_expire_secs: cos.sign_expire_secs,
                timeout_secs: cos.timeout_secs,
            })?;
            Ok(Arc::new(storage))
        }
        StorageBackend::Local => {
            let storage = LocalObjectStorage::new(
                &config.storage.local_dir,
                config.storage.public_base_url.clone(),
            )
            .await?;
            Ok(Arc::new(storage))
        }
    }
}

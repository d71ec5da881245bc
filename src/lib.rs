//! VVS Worker - Redis 队列驱动的 TTS 合成 Worker
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - 任务记录、状态记录、结果记录、结果文件 key
//!
//! 应用层 (application/):
//! - Ports: JobQueue, AudioFetcher, TtsEngine, AudioEncoder, ObjectStorage
//! - Commands: 处理队列任务、提交任务
//! - Queries: 任务状态、健康检查
//!
//! 基础设施层 (infrastructure/):
//! - Queue: Redis 任务队列与状态存储
//! - Memory: 进程内队列实现
//! - Worker: TtsWorker 队列消费循环
//! - Adapters: 参考音频下载, TTS Client, WAV 编码, COS / 本地存储
//! - HTTP: 可选运维接口

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};

//! Infrastructure Layer - 基础设施层
//!
//! 提供所有端口的具体实现

pub mod adapters;
pub mod http;
pub mod memory;
pub mod queue;
pub mod worker;

pub use memory::{InMemoryJobQueue, InMemoryQueueConfig};
pub use queue::{RedisJobQueue, RedisQueueConfig};
pub use worker::{TtsWorker, TtsWorkerConfig};

//! Queue Layer - Redis 任务队列

mod redis_queue;

pub use redis_queue::{RedisJobQueue, RedisQueueConfig};

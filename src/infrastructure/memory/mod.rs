//! Memory Layer - In-Memory Queue
//!
//! 实现进程内 JobQueue，用于测试与本地调试

mod job_queue;

pub use job_queue::{InMemoryJobQueue, InMemoryQueueConfig};

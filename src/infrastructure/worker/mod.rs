//! Worker Layer - Background Job Processing
//!
//! 实现 TtsWorker，消费队列中的 TTS 任务

mod tts_worker;

pub use tts_worker::{TtsWorker, TtsWorkerConfig};

//! 应用层 - 命令（写操作）
//!
//! 处理队列任务、提交新任务

mod job_commands;

pub mod handlers;

pub use job_commands::*;

//! 应用层 - 查询（读操作）

mod task_queries;

pub mod handlers;

pub use task_queries::*;

//! Command Handlers 实现

mod job_handlers;

pub use job_handlers::*;

//! HTTP Layer - 运维接口
//!
//! 可选的 HTTP 服务：健康检查、手动提交任务、查询任务状态

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use routes::create_routes;
pub use server::{HttpServer, ServerConfig};
pub use state::AppState;

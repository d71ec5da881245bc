//! HTTP Handlers

mod health;
mod ping;
mod task;

pub use health::*;
pub use ping::*;
pub use task::*;

//! Storage Adapter - 结果对象存储

mod cos_storage;
mod local_storage;

pub use cos_storage::{CosObjectStorage, CosSigner, CosStorageConfig};
pub use local_storage::LocalObjectStorage;

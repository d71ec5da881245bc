//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod audio_encoder;
mod audio_fetcher;
mod job_queue;
mod object_storage;
mod tts_engine;

pub use audio_encoder::{AudioEncoderPort, AudioInfo, EncodeError, EncodedAudio};
pub use audio_fetcher::{AudioFetcherPort, FetchError};
pub use job_queue::{JobQueuePort, QueueError};
pub use object_storage::{ObjectStoragePort, StorageError};
pub use tts_engine::{
    InferParams, InferRequest, InferResponse, ReferenceAudio, SynthesizedAudio, TtsEnginePort,
    TtsError,
};

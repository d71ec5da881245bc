//! Audio Adapter - 合成结果编码

mod wav_encoder;

pub use wav_encoder::{probe_wav, WavEncoder};

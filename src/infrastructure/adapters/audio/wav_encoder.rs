//! WAV Encoder - PCM 采样到 WAV 的编码器
//!
//! 支持：
//! - PCM f32 → WAV (16-bit) / 裸 PCM (16-bit LE)
//! - 引擎已编码数据的透传（WAV 会解析头部取得时长）

use crate::application::ports::{
    AudioEncoderPort, AudioInfo, EncodeError, EncodedAudio, SynthesizedAudio,
};
use crate::domain::AudioFormat;

const BITS_PER_SAMPLE: u16 = 16;

/// WAV fmt chunk
#[derive(Debug, Clone)]
struct FmtChunk {
    audio_format: u16,
    num_channels: u16,
    sample_rate: u32,
    byte_rate: u32,
    bits_per_sample: u16,
}

/// WAV 编码器
#[derive(Debug, Default, Clone)]
pub struct WavEncoder;

impl WavEncoder {
    pub fn new() -> Self {
        Self
    }

    /// 将 PCM f32 样本编码为 WAV
    pub fn encode_wav(&self, samples: &[f32], sample_rate: u32, channels: u16) -> Vec<u8> {
        let byte_rate = sample_rate * channels as u32 * (BITS_PER_SAMPLE / 8) as u32;
        let block_align = channels * (BITS_PER_SAMPLE / 8);

        let data_size = samples.len() * 2;
        let file_size = 36 + data_size;

        let mut wav = Vec::with_capacity(44 + data_size);

        // RIFF header
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&(file_size as u32).to_le_bytes());
        wav.extend_from_slice(b"WAVE");

        // fmt chunk
        wav.extend_from_slice(b"fmt ");
        wav.extend_from_slice(&16u32.to_le_bytes()); // chunk size
        wav.extend_from_slice(&1u16.to_le_bytes()); // PCM format
        wav.extend_from_slice(&channels.to_le_bytes());
        wav.extend_from_slice(&sample_rate.to_le_bytes());
        wav.extend_from_slice(&byte_rate.to_le_bytes());
        wav.extend_from_slice(&block_align.to_le_bytes());
        wav.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

        // data chunk
        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&(data_size as u32).to_le_bytes());
        wav.extend(pcm_i16_le(samples));

        wav
    }
}

/// f32 [-1, 1] → i16 little endian
fn pcm_i16_le(samples: &[f32]) -> impl Iterator<Item = u8> + '_ {
    samples.iter().flat_map(|&s| {
        let clamped = s.clamp(-1.0, 1.0);
        ((clamped * 32767.0) as i16).to_le_bytes()
    })
}

fn read_u16(data: &[u8], pos: usize) -> u16 {
    u16::from_le_bytes([data[pos], data[pos + 1]])
}

fn read_u32(data: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
}

/// 解析 WAV 文件头，获取音频信息
pub fn probe_wav(data: &[u8]) -> Result<AudioInfo, EncodeError> {
    if data.len() < 44 {
        return Err(EncodeError::InvalidInput("WAV data too short".to_string()));
    }

    // 验证 RIFF 头
    if &data[0..4] != b"RIFF" {
        return Err(EncodeError::InvalidInput(
            "Invalid WAV: missing RIFF header".to_string(),
        ));
    }

    // 验证 WAVE 标识
    if &data[8..12] != b"WAVE" {
        return Err(EncodeError::InvalidInput(
            "Invalid WAV: missing WAVE identifier".to_string(),
        ));
    }

    let mut pos = 12;
    let mut fmt: Option<FmtChunk> = None;
    let mut data_size: Option<usize> = None;

    while pos + 8 <= data.len() {
        let chunk_id = &data[pos..pos + 4];
        let chunk_size = read_u32(data, pos + 4) as usize;
        let body = pos + 8;

        match chunk_id {
            b"fmt " => {
                if chunk_size < 16 || body + 16 > data.len() {
                    return Err(EncodeError::InvalidInput(
                        "Invalid fmt chunk size".to_string(),
                    ));
                }
                fmt = Some(FmtChunk {
                    audio_format: read_u16(data, body),
                    num_channels: read_u16(data, body + 2),
                    sample_rate: read_u32(data, body + 4),
                    byte_rate: read_u32(data, body + 8),
                    bits_per_sample: read_u16(data, body + 14),
                });
            }
            b"data" => {
                // 流式写出的 WAV 可能把 data 大小写成 0 或 0xFFFFFFFF
                data_size = Some(chunk_size.min(data.len() - body));
                break;
            }
            _ => {}
        }

        pos = body + chunk_size;
        // 对齐到偶数字节
        if chunk_size % 2 != 0 {
            pos += 1;
        }
    }

    let fmt = fmt.ok_or_else(|| {
        EncodeError::InvalidInput("Invalid WAV: missing fmt chunk".to_string())
    })?;
    let data_size = data_size.ok_or_else(|| {
        EncodeError::InvalidInput("Invalid WAV: missing data chunk".to_string())
    })?;

    if fmt.audio_format != 1 && fmt.audio_format != 3 && fmt.audio_format != 0xFFFE {
        tracing::debug!(audio_format = fmt.audio_format, "Non-PCM WAV payload");
    }

    let duration_ms = if fmt.byte_rate > 0 {
        (data_size as u64 * 1000) / fmt.byte_rate as u64
    } else {
        0
    };

    Ok(AudioInfo {
        duration_ms,
        sample_rate: fmt.sample_rate,
        channels: fmt.num_channels,
        bits_per_sample: fmt.bits_per_sample,
        data_size,
    })
}

impl AudioEncoderPort for WavEncoder {
    fn encode(
        &self,
        audio: SynthesizedAudio,
        format: AudioFormat,
    ) -> Result<EncodedAudio, EncodeError> {
        match audio {
            SynthesizedAudio::Encoded {
                data,
                format: actual,
            } => {
                if actual != format {
                    return Err(EncodeError::FormatMismatch {
                        expected: format,
                        actual,
                    });
                }
                let duration_ms = match format {
                    AudioFormat::Wav => Some(probe_wav(&data)?.duration_ms),
                    _ => None,
                };
                Ok(EncodedAudio {
                    data,
                    format,
                    duration_ms,
                })
            }
            SynthesizedAudio::Pcm {
                sample_rate,
                channels,
                samples,
            } => {
                if sample_rate == 0 || channels == 0 {
                    return Err(EncodeError::InvalidInput(format!(
                        "sample_rate={}, channels={}",
                        sample_rate, channels
                    )));
                }

                let duration_ms =
                    (samples.len() as u64 * 1000) / (sample_rate as u64 * channels as u64);

                let data = match format {
                    AudioFormat::Wav => self.encode_wav(&samples, sample_rate, channels),
                    AudioFormat::Pcm => pcm_i16_le(&samples).collect(),
                    other => return Err(EncodeError::UnsupportedFormat(other)),
                };

                Ok(EncodedAudio {
                    data,
                    format,
                    duration_ms: Some(duration_ms),
                })
            }
        }
    }

    fn supports_format(&self, format: AudioFormat) -> bool {
        matches!(format, AudioFormat::Wav | AudioFormat::Pcm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_second_tone() -> Vec<f32> {
        (0..16000)
            .map(|i| (i as f32 * 440.0 * 2.0 * std::f32::consts::PI / 16000.0).sin() * 0.5)
            .collect()
    }

    #[test]
    fn test_encode_pcm_to_wav() {
        let encoder = WavEncoder::new();
        let encoded = encoder
            .encode(
                SynthesizedAudio::Pcm {
                    sample_rate: 16000,
                    channels: 1,
                    samples: one_second_tone(),
                },
                AudioFormat::Wav,
            )
            .unwrap();

        assert_eq!(encoded.format, AudioFormat::Wav);
        assert_eq!(encoded.duration_ms, Some(1000));
        assert_eq!(encoded.data.len(), 44 + 32000);

        let info = probe_wav(&encoded.data).unwrap();
        assert_eq!(info.sample_rate, 16000);
        assert_eq!(info.channels, 1);
        assert_eq!(info.bits_per_sample, 16);
        assert_eq!(info.duration_ms, 1000);
    }

    #[test]
    fn test_samples_are_clamped() {
        let wav = WavEncoder::new().encode_wav(&[2.0, -2.0], 8000, 1);
        assert_eq!(i16::from_le_bytes([wav[44], wav[45]]), 32767);
        assert_eq!(i16::from_le_bytes([wav[46], wav[47]]), -32767);
    }

    #[test]
    fn test_encoded_passthrough() {
        let wav = WavEncoder::new().encode_wav(&one_second_tone(), 16000, 1);
        let encoded = WavEncoder::new()
            .encode(
                SynthesizedAudio::Encoded {
                    data: wav.clone(),
                    format: AudioFormat::Wav,
                },
                AudioFormat::Wav,
            )
            .unwrap();
        assert_eq!(encoded.data, wav);
        assert_eq!(encoded.duration_ms, Some(1000));
    }

    #[test]
    fn test_format_mismatch() {
        let err = WavEncoder::new()
            .encode(
                SynthesizedAudio::Encoded {
                    data: vec![1, 2, 3],
                    format: AudioFormat::Mp3,
                },
                AudioFormat::Wav,
            )
            .unwrap_err();
        assert!(matches!(err, EncodeError::FormatMismatch { .. }));
    }

    #[test]
    fn test_pcm_cannot_become_mp3() {
        let encoder = WavEncoder::new();
        assert!(!encoder.supports_format(AudioFormat::Mp3));
        let err = encoder
            .encode(
                SynthesizedAudio::Pcm {
                    sample_rate: 16000,
                    channels: 1,
                    samples: vec![0.0; 160],
                },
                AudioFormat::Mp3,
            )
            .unwrap_err();
        assert!(matches!(err, EncodeError::UnsupportedFormat(AudioFormat::Mp3)));
    }

    #[test]
    fn test_probe_rejects_garbage() {
        assert!(probe_wav(b"RIFF").is_err());
        assert!(probe_wav(&[0u8; 64]).is_err());
    }
}

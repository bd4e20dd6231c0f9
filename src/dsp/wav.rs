//! RIFF/WAVE container — 16-bit PCM encoding of a rendered buffer.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::error::{Result, SonifyError};

/// Size of the canonical PCM header.
pub const HEADER_LEN: usize = 44;

const BITS_PER_SAMPLE: u16 = 16;

/// Interleaved floating-point samples, as produced by the offline renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    pub sample_rate: u32,
    pub channels: u16,
    /// Interleaved frames; `samples.len()` is a multiple of `channels`.
    pub samples: Vec<f32>,
}

impl SampleBuffer {
    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> Self {
        SampleBuffer {
            sample_rate,
            channels: 1,
            samples,
        }
    }

    /// Frames per channel.
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration_seconds(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }
}

/// A finished WAV file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFile {
    bytes: Vec<u8>,
}

impl AudioFile {
    pub const MIME_TYPE: &'static str = "audio/wav";

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn header(&self) -> Result<WavHeader> {
        WavHeader::parse(&self.bytes)
    }

    /// `data:audio/wav;base64,...` for embedding in metadata.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", Self::MIME_TYPE, STANDARD.encode(&self.bytes))
    }
}

/// Float to signed 16-bit: clamp to [-1, 1], scale negatives by 32768 and
/// the rest by 32767, truncate toward zero.
pub fn sample_to_i16(sample: f32) -> i16 {
    let s = if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) };
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Encode a sample buffer as a 16-bit PCM WAV file. Takes the buffer by value.
pub fn encode_wav(buffer: SampleBuffer) -> Result<AudioFile> {
    let channels = buffer.channels.max(1);
    let sample_rate = buffer.sample_rate;
    let block_align = channels * (BITS_PER_SAMPLE / 8);
    let byte_rate = sample_rate * block_align as u32;

    let frames = buffer.samples.len() / channels as usize;
    let data_bytes = frames as u64 * block_align as u64;
    if data_bytes + 36 > u32::MAX as u64 {
        return Err(SonifyError::BufferTooLarge { bytes: data_bytes });
    }
    let data_size = data_bytes as u32;
    let file_size = 36 + data_size;

    let mut buf = Vec::with_capacity(HEADER_LEN + data_size as usize);

    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    // a trailing partial frame is dropped
    for &sample in &buffer.samples[..frames * channels as usize] {
        buf.extend_from_slice(&sample_to_i16(sample).to_le_bytes());
    }

    debug_assert_eq!(buf.len(), HEADER_LEN + data_size as usize, "header sizes must match payload");
    Ok(AudioFile { bytes: buf })
}

/// Decoded fields of a canonical 44-byte PCM header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    /// RIFF chunk size: total length minus 8.
    pub file_size: u32,
    pub audio_format: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub data_size: u32,
}

impl WavHeader {
    /// Parse and validate a header, including that its sizes match `bytes`.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(invalid(format!("{} bytes is shorter than a header", bytes.len())));
        }
        let u16_at = |i: usize| u16::from_le_bytes([bytes[i], bytes[i + 1]]);
        let u32_at = |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);

        for (offset, tag) in [(0, b"RIFF"), (8, b"WAVE"), (12, b"fmt "), (36, b"data")] {
            if bytes[offset..offset + 4] != tag[..] {
                return Err(invalid(format!(
                    "expected {:?} at byte {offset}",
                    String::from_utf8_lossy(tag)
                )));
            }
        }
        if u32_at(16) != 16 {
            return Err(invalid("fmt chunk must be 16 bytes".into()));
        }

        let header = WavHeader {
            file_size: u32_at(4),
            audio_format: u16_at(20),
            channels: u16_at(22),
            sample_rate: u32_at(24),
            byte_rate: u32_at(28),
            block_align: u16_at(32),
            bits_per_sample: u16_at(34),
            data_size: u32_at(40),
        };

        if header.audio_format != 1 {
            return Err(invalid(format!("audio format {} is not PCM", header.audio_format)));
        }
        if header.file_size as usize + 8 != bytes.len() {
            return Err(invalid(format!(
                "RIFF size {} does not match {} bytes",
                header.file_size,
                bytes.len()
            )));
        }
        if header.data_size as usize + HEADER_LEN != bytes.len() {
            return Err(invalid(format!(
                "data size {} does not match {} payload bytes",
                header.data_size,
                bytes.len() - HEADER_LEN
            )));
        }
        Ok(header)
    }

    /// Frames per channel in the data chunk.
    pub fn frames(&self) -> u32 {
        if self.block_align == 0 {
            0
        } else {
            self.data_size / self.block_align as u32
        }
    }
}

fn invalid(msg: String) -> SonifyError {
    SonifyError::InvalidWav(msg)
}

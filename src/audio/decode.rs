//! WAV decoding into mono `f32` segments.
//!
//! [`decode_segment`] is the pipeline entry point: it reads a WAV payload
//! returned by the synthesis service, rejects it when the sample rate is not
//! the pipeline's reference rate, and averages interleaved channels to mono.
//! [`read_wav`] accepts any rate and is used for uploaded voice samples.
//!
//! ```rust
//! use voice_narrator::audio::{decode_segment, encode_wav_pcm16, AudioError};
//!
//! let wav = encode_wav_pcm16(&[0.0, 0.5, -0.5], 16_000).unwrap();
//! let err = decode_segment(&wav, 24_000).unwrap_err();
//! assert!(matches!(err, AudioError::SampleRateMismatch { expected: 24_000, actual: 16_000 }));
//! ```

use std::io::Cursor;

use hound::{SampleFormat, WavReader};

use crate::audio::error::AudioError;

// ---------------------------------------------------------------------------
// AudioSegment
// ---------------------------------------------------------------------------

/// Mono waveform at a known sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSegment {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioSegment {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Number of samples covering `secs` at `sample_rate`, rounded to nearest.
pub fn secs_to_samples(secs: f32, sample_rate: u32) -> usize {
    if secs <= 0.0 {
        return 0;
    }
    (f64::from(secs) * f64::from(sample_rate)).round() as usize
}

// ---------------------------------------------------------------------------
// downmix_to_mono
// ---------------------------------------------------------------------------

/// Mix interleaved multi-channel audio down to mono by averaging all channels.
///
/// * `channels == 1` returns the input unchanged.
/// * `channels == 0` returns an empty vector.
/// * A trailing partial frame is dropped.
pub fn downmix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect()
        }
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode a WAV payload at whatever rate it was recorded.
pub fn read_wav(bytes: &[u8]) -> Result<AudioSegment, AudioError> {
    decode(bytes, None)
}

/// Decode a synthesized chunk, requiring `expected_rate`.
pub fn decode_segment(bytes: &[u8], expected_rate: u32) -> Result<AudioSegment, AudioError> {
    decode(bytes, Some(expected_rate))
}

fn decode(bytes: &[u8], expected_rate: Option<u32>) -> Result<AudioSegment, AudioError> {
    let reader = WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();

    if let Some(expected) = expected_rate {
        if spec.sample_rate != expected {
            return Err(AudioError::SampleRateMismatch {
                expected,
                actual: spec.sample_rate,
            });
        }
    }

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()?,
        (SampleFormat::Int, bits @ 8..=32) => {
            let scale = (1i64 << (bits - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<Vec<_>, _>>()?
        }
        (format, bits) => {
            return Err(AudioError::UnsupportedFormat(format!(
                "{format:?} at {bits} bits per sample"
            )))
        }
    };

    Ok(AudioSegment::new(
        downmix_to_mono(&interleaved, spec.channels),
        spec.sample_rate,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

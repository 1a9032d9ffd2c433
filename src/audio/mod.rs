//! Audio handling — WAV decode → rate check → mono → assembly → PCM16 encode.
//!
//! # Pipeline
//!
//! ```text
//! chunk WAV bytes → decode_segment (rate must match, channels averaged)
//!                 → WaveformAssembler::push (segment + pause)
//!                 → finish → [normalize_peak] → encode_wav_pcm16
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use voice_narrator::audio::{
//!     decode_segment, encode_wav_pcm16, PauseSchedule, WaveformAssembler,
//! };
//!
//! let chunk_wav = encode_wav_pcm16(&[0.1; 240], 24_000).unwrap();
//! let segment = decode_segment(&chunk_wav, 24_000).unwrap();
//!
//! let mut assembler = WaveformAssembler::new(24_000, PauseSchedule::default());
//! assembler.push(&segment).unwrap();
//! let waveform = assembler.finish();
//! assert_eq!(waveform.len(), 240 + 8_400); // segment + 0.35 s pause
//! ```

pub mod assemble;
pub mod decode;
pub mod encode;
pub mod error;
pub mod quality;

pub use assemble::{PauseSchedule, WaveformAssembler};
pub use decode::{decode_segment, downmix_to_mono, read_wav, secs_to_samples, AudioSegment};
pub use encode::{encode_wav_pcm16, f32_to_pcm16, normalize_peak};
pub use error::AudioError;
pub use quality::VoiceSampleCheck;

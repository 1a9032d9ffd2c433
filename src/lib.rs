//! Long-form voice-cloning narration on top of a remote TTS endpoint.
//!
//! ```text
//! text ─▶ text::chunk_text ─▶ pipeline::NarrationOrchestrator
//!                                  │  per chunk, in order
//!                                  ├─▶ synthesis::Synthesizer   (remote job + polling)
//!                                  ├─▶ audio::decode_segment    (rate check, mono)
//!                                  └─▶ audio::WaveformAssembler (pauses)
//!                              ─▶ voice::ObjectStore::put("audio/<job>.wav")
//! ```

pub mod audio;
pub mod config;
pub mod pipeline;
pub mod synthesis;
pub mod text;
pub mod voice;

//! Remote voice-cloning synthesis.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                   Synthesizer (trait)                       │
//! │                                                            │
//! │   ┌──────────────────┐        ┌─────────────────────────┐  │
//! │   │ RemoteSynthesizer│──uses─▶│ RemoteTransport (trait) │  │
//! │   │ - PollPolicy     │        │  HttpTransport          │  │
//! │   │ - Sleeper        │        │  submit / status        │  │
//! │   └────────┬─────────┘        └─────────────────────────┘  │
//! │            │                                               │
//! │            ▼                                               │
//! │   text + VoiceConditioning + SynthesisParams → WAV bytes   │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use voice_narrator::config::RemoteConfig;
//! use voice_narrator::synthesis::{
//!     RemoteSynthesizer, SynthesisParams, Synthesizer, VoiceConditioning,
//! };
//!
//! # async fn run() -> Result<(), voice_narrator::synthesis::SynthesisError> {
//! let synth = RemoteSynthesizer::from_config(&RemoteConfig::default());
//! let voice = VoiceConditioning::reference_audio(&std::fs::read("me.wav").unwrap());
//! let wav = synth
//!     .synthesize("Hello there.", &voice, &SynthesisParams::default())
//!     .await?;
//! # let _ = wav;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod params;
pub mod poll;
pub mod protocol;
pub mod transport;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use client::{RemoteSynthesizer, SynthesisError, Synthesizer};
pub use params::{ParamError, SynthesisParams, VoiceConditioning};
pub use poll::{poll_until, PollPolicy, Polled, Sleeper, TokioSleeper};
pub use protocol::{JobResponse, RemoteStatus, RunRequest};
pub use transport::{parse_response, HttpTransport, RemoteTransport};

// test-only re-export so the pipeline tests can import MockSynthesizer.
#[cfg(test)]
pub use client::MockSynthesizer;

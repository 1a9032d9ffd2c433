//! Core `Synthesizer` trait and `RemoteSynthesizer` implementation.
//!
//! `RemoteSynthesizer` turns one text chunk into WAV bytes:
//!
//! ```text
//! submit ──▶ COMPLETED ───────────────────────────────▶ decode audio_b64
//!    │
//!    └────▶ IN_QUEUE / IN_PROGRESS ──▶ poll status (interval × attempts)
//!                                          │
//!                                          ├─ COMPLETED ──▶ decode audio_b64
//!                                          ├─ FAILED / CANCELLED / TIMED_OUT ──▶ RemoteFailed
//!                                          └─ budget spent ──▶ Timeout
//! ```
//!
//! Each call is independent; nothing is cached between chunks.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::RemoteConfig;
use crate::synthesis::params::{SynthesisParams, VoiceConditioning};
use crate::synthesis::poll::{poll_until, PollPolicy, Polled, Sleeper, TokioSleeper};
use crate::synthesis::protocol::{JobResponse, RemoteStatus, RunRequest};
use crate::synthesis::transport::{HttpTransport, RemoteTransport};

// ---------------------------------------------------------------------------
// SynthesisError
// ---------------------------------------------------------------------------

/// Errors that can occur while synthesizing a single chunk.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SynthesisError {
    /// Connection failure or a request that exceeded its HTTP timeout.
    #[error("synthesis request failed: {0}")]
    Transport(String),

    /// The endpoint answered with a non-success HTTP status.
    #[error("synthesis endpoint returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The response was not in the expected shape.
    #[error("invalid remote output: {0}")]
    Protocol(String),

    /// The remote job reached a failure state.
    #[error("remote job {job_id} ended with {status}: {detail}")]
    RemoteFailed {
        job_id: String,
        status: String,
        detail: String,
    },

    /// The job was still pending when the polling budget ran out.
    #[error("remote job {job_id} timed out after {attempts} status checks")]
    Timeout { job_id: String, attempts: u32 },
}

impl From<reqwest::Error> for SynthesisError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SynthesisError::Transport(format!("request timed out: {e}"))
        } else {
            SynthesisError::Transport(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Synthesizer trait
// ---------------------------------------------------------------------------

/// Async trait for turning one chunk of text into audio in the target voice.
///
/// Implementors must be `Send + Sync` so they can be shared as
/// `Arc<dyn Synthesizer>` by concurrently running jobs.
///
/// Returns a WAV container; decoding and rate checks happen in the caller.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceConditioning,
        params: &SynthesisParams,
    ) -> Result<Vec<u8>, SynthesisError>;
}

// ---------------------------------------------------------------------------
// RemoteSynthesizer
// ---------------------------------------------------------------------------

pub struct RemoteSynthesizer<T: RemoteTransport = HttpTransport> {
    transport: T,
    policy: PollPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl RemoteSynthesizer<HttpTransport> {
    pub fn from_config(config: &RemoteConfig) -> Self {
        Self::new(
            HttpTransport::from_config(config),
            PollPolicy::from_config(config),
        )
    }
}

impl<T: RemoteTransport> RemoteSynthesizer<T> {
    pub fn new(transport: T, policy: PollPolicy) -> Self {
        Self {
            transport,
            policy,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replace the sleeper used between status checks.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn await_completion(&self, initial: JobResponse) -> Result<JobResponse, SynthesisError> {
        if !initial.status.is_pending() {
            return Ok(initial);
        }

        let job_id = initial
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SynthesisError::Protocol("pending job has no id".into()))?;
        log::info!(
            "synthesis: job {} is {}, polling every {:?}",
            job_id,
            initial.status.as_str(),
            self.policy.interval
        );

        let transport = &self.transport;
        let id = job_id.as_str();
        let polled = poll_until(
            &self.policy,
            self.sleeper.as_ref(),
            |_| transport.status(id),
            |r: &JobResponse| !r.status.is_pending(),
        )
        .await?;

        match polled {
            Polled::Settled { value, attempts } => {
                log::debug!(
                    "synthesis: job {} settled as {} after {} checks",
                    job_id,
                    value.status.as_str(),
                    attempts
                );
                Ok(value)
            }
            Polled::Exhausted { attempts, .. } => {
                log::warn!(
                    "synthesis: job {} still pending after {} checks",
                    job_id,
                    attempts
                );
                Err(SynthesisError::Timeout { job_id, attempts })
            }
        }
    }
}

/// Turn a settled response into audio bytes or a typed failure.
fn extract_audio(response: &JobResponse) -> Result<Vec<u8>, SynthesisError> {
    let job_id = response.id.clone().unwrap_or_default();
    let handler_error = response
        .output
        .as_ref()
        .and_then(|o| o.get("error"))
        .map_or(false, |e| !e.is_null());

    match response.status {
        RemoteStatus::Completed if handler_error => Err(SynthesisError::RemoteFailed {
            job_id,
            status: response.status.as_str().to_string(),
            detail: response.failure_detail().unwrap_or_default(),
        }),
        RemoteStatus::Completed => response.audio_bytes(),
        RemoteStatus::Failed | RemoteStatus::Cancelled | RemoteStatus::TimedOut => {
            Err(SynthesisError::RemoteFailed {
                job_id,
                status: response.status.as_str().to_string(),
                detail: response
                    .failure_detail()
                    .unwrap_or_else(|| "no detail reported".into()),
            })
        }
        RemoteStatus::InQueue | RemoteStatus::InProgress | RemoteStatus::Unknown => Err(
            SynthesisError::Protocol(format!("unexpected job status {}", response.status.as_str())),
        ),
    }
}

#[async_trait]
impl<T: RemoteTransport> Synthesizer for RemoteSynthesizer<T> {
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceConditioning,
        params: &SynthesisParams,
    ) -> Result<Vec<u8>, SynthesisError> {
        let request = RunRequest::tts(text, voice, params);
        log::debug!(
            "synthesis: submitting {} chars (exaggeration={}, temperature={}, cfg_weight={})",
            text.chars().count(),
            params.exaggeration,
            params.temperature,
            params.cfg_weight
        );

        let initial = self.transport.submit(&request).await?;
        let settled = self.await_completion(initial).await?;

        if let (Some(exec), Some(delay)) = (settled.execution_time_ms, settled.delay_time_ms) {
            log::info!(
                "synthesis: chunk done (execution {} ms, queue delay {} ms)",
                exec,
                delay
            );
        }

        extract_audio(&settled)
    }
}

// ---------------------------------------------------------------------------
// MockSynthesizer  (test-only)
// ---------------------------------------------------------------------------

/// A test double that answers every call with a short constant-valued WAV.
///
/// Call `n` (1-based) produces `samples_per_call` samples of value
/// `n as f32 / 100.0`, which lets tests check assembly order.
#[cfg(test)]
pub struct MockSynthesizer {
    sample_rate: u32,
    samples_per_call: usize,
    fail_on_call: Option<(usize, SynthesisError)>,
    calls: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockSynthesizer {
    /// Succeed on every call.
    pub fn ok(sample_rate: u32, samples_per_call: usize) -> Self {
        Self {
            sample_rate,
            samples_per_call,
            fail_on_call: None,
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Succeed until call number `call` (1-based), which returns `error`.
    pub fn failing_on(mut self, call: usize, error: SynthesisError) -> Self {
        self.fail_on_call = Some((call, error));
        self
    }

    /// Texts received so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Synthesizer for MockSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        _voice: &VoiceConditioning,
        _params: &SynthesisParams,
    ) -> Result<Vec<u8>, SynthesisError> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(text.to_string());
            calls.len()
        };
        if let Some((call, err)) = &self.fail_on_call {
            if *call == n {
                return Err(err.clone());
            }
        }
        let samples = vec![n as f32 / 100.0; self.samples_per_call];
        crate::audio::encode_wav_pcm16(&samples, self.sample_rate)
            .map_err(|e| SynthesisError::Protocol(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

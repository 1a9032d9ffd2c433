//! Narration orchestrator: drives one job from text to stored audio.
//!
//! # Pipeline flow
//!
//! ```text
//! start_processing (progress 5)
//!   └─▶ voice conditioning: speaker embedding, or reference WAV as base64 once
//!         └─▶ chunk_text ── zero chunks ──▶ Validation
//!               └─▶ ChunkFilter::plan_all
//!                     └─▶ for each plan, in chunk order:
//!                           Skip        → count, log
//!                           Synthesize  → synthesize → decode_segment → assembler.push
//!                           advance progress (5‥90)
//!                     └─▶ nothing pushed ──▶ NoAudio
//!                     └─▶ finish → [normalize] → PCM16 WAV → put audio/<id>.wav
//!                           └─▶ record voice usage → complete (progress 100)
//! any error ──▶ fail(kind, message), progress left as is
//! ```
//!
//! Chunks are synthesized strictly one at a time; partial audio is dropped
//! when any chunk fails.

use std::sync::Arc;

use thiserror::Error;

use crate::audio::{
    decode_segment, encode_wav_pcm16, normalize_peak, AudioError, PauseSchedule,
    WaveformAssembler,
};
use crate::config::AppConfig;
use crate::synthesis::{SynthesisError, SynthesisParams, Synthesizer};
use crate::text::{chunk_text, ChunkFilter, ChunkPlan};
use crate::voice::{ObjectStore, StorageError, VoiceError, VoiceLibrary, VoiceRecord};

use super::state::{progress_for, ErrorKind, JobStateError, SynthesisJob, PROGRESS_FLOOR};
use super::store::{JobStore, JobStoreError};

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// Errors that end a narration job.
///
/// The `Display` text is what callers see in the job's `error` field.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    #[error("{0}")]
    Validation(String),

    /// Every chunk was below the minimum meaningful length.
    #[error("no audio generated")]
    NoAudio { skipped: usize },

    #[error("chunk {chunk}: {source}")]
    Synthesis {
        chunk: usize,
        #[source]
        source: SynthesisError,
    },

    #[error("chunk {chunk}: {source}")]
    Decode {
        chunk: usize,
        #[source]
        source: AudioError,
    },

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Voice(#[from] VoiceError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Job(#[from] JobStoreError),

    /// The job task panicked or was cancelled by the runtime.
    #[error("job task aborted: {0}")]
    Aborted(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Validation(_) => ErrorKind::Validation,
            PipelineError::NoAudio { .. } => ErrorKind::NoAudio,
            PipelineError::Synthesis { source, .. } => match source {
                SynthesisError::Transport(_) | SynthesisError::Http { .. } => ErrorKind::Transport,
                SynthesisError::Protocol(_) | SynthesisError::RemoteFailed { .. } => {
                    ErrorKind::Protocol
                }
                SynthesisError::Timeout { .. } => ErrorKind::Timeout,
            },
            PipelineError::Decode { .. } | PipelineError::Audio(_) => ErrorKind::Data,
            PipelineError::Voice(e) => match e {
                VoiceError::NotFound(_) | VoiceError::AccessDenied { .. } => ErrorKind::Validation,
                VoiceError::Audio(_) | VoiceError::Reference(_) => ErrorKind::Data,
                VoiceError::Storage(_) => ErrorKind::Storage,
            },
            PipelineError::Storage(_) | PipelineError::Job(_) => ErrorKind::Storage,
            PipelineError::Aborted(_) => ErrorKind::Internal,
        }
    }
}

// ---------------------------------------------------------------------------
// Settings, request and outcome
// ---------------------------------------------------------------------------

/// Per-pipeline knobs taken from [`AppConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub max_chars: usize,
    pub min_chunk_chars: usize,
    pub sample_rate: u32,
    pub schedule: PauseSchedule,
    pub normalize_peak: Option<f32>,
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_chars: config.chunker.max_chars,
            min_chunk_chars: config.chunker.min_chunk_chars,
            sample_rate: config.audio.sample_rate,
            schedule: PauseSchedule::from_config(&config.audio),
            normalize_peak: config.audio.normalize_peak,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Everything the orchestrator needs to run an accepted job.
#[derive(Debug, Clone)]
pub struct NarrationRequest {
    pub job_id: String,
    pub text: String,
    pub voice: VoiceRecord,
    pub params: SynthesisParams,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NarrationOutcome {
    pub audio_url: String,
    pub duration_secs: f32,
    pub synthesized: usize,
    pub skipped: usize,
}

// ---------------------------------------------------------------------------
// NarrationOrchestrator
// ---------------------------------------------------------------------------

pub struct NarrationOrchestrator {
    jobs: Arc<dyn JobStore>,
    synthesizer: Arc<dyn Synthesizer>,
    library: Arc<VoiceLibrary>,
    store: Arc<dyn ObjectStore>,
    settings: PipelineSettings,
}

impl NarrationOrchestrator {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        synthesizer: Arc<dyn Synthesizer>,
        library: Arc<VoiceLibrary>,
        settings: PipelineSettings,
    ) -> Self {
        let store = library.store();
        Self {
            jobs,
            synthesizer,
            library,
            store,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run the job to a terminal state.
    ///
    /// The job must already be in the store.  On error the job is marked
    /// failed before the error is returned.
    pub async fn run(&self, request: NarrationRequest) -> Result<NarrationOutcome, PipelineError> {
        match self.execute(&request).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.set_failed(&request.job_id, &e);
                Err(e)
            }
        }
    }

    async fn execute(&self, request: &NarrationRequest) -> Result<NarrationOutcome, PipelineError> {
        let id = request.job_id.as_str();
        let rate = self.settings.sample_rate;

        // ── 1. Voice reference ───────────────────────────────────────────
        self.transition(id, |j| j.start_processing(PROGRESS_FLOOR))?;
        let voice = self.library.conditioning(&request.voice).await?;

        // ── 2. Chunk and plan ────────────────────────────────────────────
        let chunks = chunk_text(&request.text, self.settings.max_chars);
        if chunks.is_empty() {
            return Err(PipelineError::Validation(
                "text contains nothing to narrate".into(),
            ));
        }
        let plans = ChunkFilter::new(self.settings.min_chunk_chars).plan_all(&chunks);
        let total = plans.len();
        log::info!("pipeline: job {} split into {} chunks", id, total);

        // ── 3. Synthesize in chunk order ─────────────────────────────────
        let mut assembler = WaveformAssembler::new(rate, self.settings.schedule);
        let mut skipped = 0;

        for (done, plan) in plans.iter().enumerate() {
            match plan {
                ChunkPlan::Skip { .. } => skipped += 1,
                ChunkPlan::Synthesize { index, text } => {
                    log::debug!(
                        "pipeline: job {} chunk {}/{} ({} chars, {} words)",
                        id,
                        index,
                        total,
                        text.chars().count(),
                        text.split_whitespace().count()
                    );
                    let bytes = self
                        .synthesizer
                        .synthesize(text, &voice, &request.params)
                        .await
                        .map_err(|source| PipelineError::Synthesis {
                            chunk: *index,
                            source,
                        })?;
                    let segment = decode_segment(&bytes, rate).map_err(|source| {
                        PipelineError::Decode {
                            chunk: *index,
                            source,
                        }
                    })?;
                    assembler.push(&segment)?;
                }
            }

            let progress = progress_for(done + 1, total);
            self.transition(id, |j| j.advance(progress))?;
        }

        if assembler.is_empty() {
            return Err(PipelineError::NoAudio { skipped });
        }

        // ── 4. Assemble and persist ──────────────────────────────────────
        let synthesized = assembler.segment_count();
        let mut waveform = assembler.finish();
        if let Some(target) = self.settings.normalize_peak {
            normalize_peak(&mut waveform.samples, target);
        }
        let duration_secs = waveform.duration_secs();
        let wav = encode_wav_pcm16(&waveform.samples, waveform.sample_rate)?;
        let audio_url = self.store.put(&format!("audio/{id}.wav"), wav).await?;

        if let Err(e) = self.library.record_usage(request.voice.voice_id).await {
            log::warn!(
                "pipeline: job {} could not count usage of voice {}: {}",
                id,
                request.voice.voice_id,
                e
            );
        }

        self.transition(id, |j| j.complete(audio_url.clone(), duration_secs))?;
        log::info!(
            "pipeline: job {} completed ({} synthesized, {} skipped, {:.2}s) → {}",
            id,
            synthesized,
            skipped,
            duration_secs,
            audio_url
        );

        Ok(NarrationOutcome {
            audio_url,
            duration_secs,
            synthesized,
            skipped,
        })
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn transition(
        &self,
        id: &str,
        mut apply: impl FnMut(&mut SynthesisJob) -> Result<(), JobStateError>,
    ) -> Result<SynthesisJob, PipelineError> {
        Ok(self.jobs.update(id, &mut apply)?)
    }

    /// Mark `id` failed with `error`'s kind and message.
    pub(crate) fn set_failed(&self, id: &str, error: &PipelineError) {
        let kind = error.kind();
        let message = error.to_string();
        match self.jobs.update(id, &mut |j| j.fail(kind, message.clone())) {
            Ok(job) => log::error!(
                "pipeline: job {} failed at {}% ({}): {}",
                id,
                job.progress,
                kind,
                message
            ),
            Err(e) => log::error!(
                "pipeline: job {} failed ({}: {}) and could not be marked: {}",
                id,
                kind,
                message,
                e
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

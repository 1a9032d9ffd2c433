//! Narration jobs: tracking, orchestration and submission.
//!
//! # Architecture
//!
//! ```text
//! NarrationService::submit(text, voice_id, user, params)
//!        │  validate (text, params, voice access) ─── Err → no job created
//!        ▼
//! JobStore::put(SynthesisJob { queued, 0 })
//!        │
//!        ▼  tokio::spawn, one task per job
//! NarrationOrchestrator::run()
//!        ├─ processing (5)      voice reference
//!        ├─ processing (5‥90)   chunk → synthesize → decode → assemble
//!        └─ completed (100)     audio/<job_id>.wav
//!           or failed           error + error_kind, progress unchanged
//!
//! NarrationService::status(id) ─▶ JobStatusView { status, progress, audio_url?, error? }
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use voice_narrator::config::AppConfig;
//! use voice_narrator::pipeline::{
//!     InMemoryJobStore, NarrationService, PipelineSettings, SubmitRequest,
//! };
//! use voice_narrator::synthesis::{RemoteSynthesizer, SynthesisParams};
//! use voice_narrator::voice::{FsObjectStore, InMemoryVoiceRepository, VoiceLibrary};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let library = Arc::new(VoiceLibrary::new(
//!         Arc::new(InMemoryVoiceRepository::new()),
//!         Arc::new(FsObjectStore::from_config(&config.storage)),
//!         &config.voice,
//!     ));
//!     let service = NarrationService::new(
//!         Arc::new(InMemoryJobStore::new()),
//!         library,
//!         Arc::new(RemoteSynthesizer::from_config(&config.remote)),
//!         PipelineSettings::from_config(&config),
//!     );
//!
//!     let handle = service
//!         .submit(SubmitRequest {
//!             text: "Once upon a time there was a crate.".into(),
//!             voice_id: 1,
//!             user_id: None,
//!             params: SynthesisParams::from(&config.synthesis),
//!         })
//!         .await
//!         .unwrap();
//!     println!("{:?}", service.status(&handle.id));
//! }
//! ```

pub mod runner;
pub mod service;
pub mod state;
pub mod store;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::{
    NarrationOrchestrator, NarrationOutcome, NarrationRequest, PipelineError, PipelineSettings,
};
pub use service::{JobHandle, NarrationService, SubmitRequest};
pub use state::{
    progress_for, ErrorKind, JobStateError, JobStatus, JobStatusView, SynthesisJob,
    PROGRESS_CEILING, PROGRESS_FLOOR,
};
pub use store::{InMemoryJobStore, JobStore, JobStoreError};

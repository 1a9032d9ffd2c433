//! Job submission and status queries.
//!
//! [`NarrationService::submit`] validates a request, creates the job and
//! spawns one tokio task per job running the orchestrator.  Jobs share
//! nothing except the [`JobStore`].
//!
//! The orchestrator runs in its own task so that a panic inside it still
//! leaves the job `failed` with kind `internal`.

use std::sync::Arc;

use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::synthesis::{SynthesisParams, Synthesizer};
use crate::voice::VoiceLibrary;

use super::runner::{
    NarrationOrchestrator, NarrationOutcome, NarrationRequest, PipelineError, PipelineSettings,
};
use super::state::{JobStatusView, SynthesisJob};
use super::store::JobStore;

/// A narration request as received from a caller.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub text: String,
    pub voice_id: i64,
    /// Requesting user; `None` skips the ownership check.
    pub user_id: Option<i64>,
    pub params: SynthesisParams,
}

/// Handle to a spawned job.
pub struct JobHandle {
    pub id: String,
    task: JoinHandle<Result<NarrationOutcome, PipelineError>>,
}

impl JobHandle {
    /// Wait for the job task to finish.
    pub async fn wait(self) -> Result<NarrationOutcome, PipelineError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(PipelineError::Aborted(e.to_string())),
        }
    }
}

pub struct NarrationService {
    jobs: Arc<dyn JobStore>,
    library: Arc<VoiceLibrary>,
    orchestrator: Arc<NarrationOrchestrator>,
}

impl NarrationService {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        library: Arc<VoiceLibrary>,
        synthesizer: Arc<dyn Synthesizer>,
        settings: PipelineSettings,
    ) -> Self {
        let orchestrator = NarrationOrchestrator::new(
            Arc::clone(&jobs),
            synthesizer,
            Arc::clone(&library),
            settings,
        );
        Self {
            jobs,
            library,
            orchestrator: Arc::new(orchestrator),
        }
    }

    pub fn library(&self) -> &VoiceLibrary {
        &self.library
    }

    /// Validate and accept a request.
    ///
    /// Validation failures are returned directly and no job is created.
    pub async fn submit(&self, request: SubmitRequest) -> Result<JobHandle, PipelineError> {
        if request.text.trim().is_empty() {
            return Err(PipelineError::Validation("text is empty".into()));
        }
        request
            .params
            .validate()
            .map_err(|e| PipelineError::Validation(e.to_string()))?;
        let voice = self
            .library
            .resolve(request.voice_id, request.user_id)
            .await?;

        let id = Uuid::new_v4().to_string();
        self.jobs.put(SynthesisJob::new(id.clone()))?;
        log::info!(
            "pipeline: job {} queued (voice {}, {} chars)",
            id,
            voice.voice_id,
            request.text.chars().count()
        );

        let orchestrator = Arc::clone(&self.orchestrator);
        let narration = NarrationRequest {
            job_id: id.clone(),
            text: request.text,
            voice,
            params: request.params,
        };
        let task = tokio::spawn(supervise(orchestrator, narration));

        Ok(JobHandle { id, task })
    }

    /// Caller-facing status of a job, if it exists.
    pub fn status(&self, id: &str) -> Option<JobStatusView> {
        self.jobs.get(id).map(|job| job.view())
    }
}

/// Run one job and make sure it ends terminal even if the run panics.
async fn supervise(
    orchestrator: Arc<NarrationOrchestrator>,
    request: NarrationRequest,
) -> Result<NarrationOutcome, PipelineError> {
    let job_id = request.job_id.clone();
    let runner = Arc::clone(&orchestrator);

    match tokio::spawn(async move { runner.run(request).await }).await {
        Ok(result) => result,
        Err(e) => {
            let error = PipelineError::Aborted(if e.is_panic() {
                "job task panicked".to_string()
            } else {
                e.to_string()
            });
            orchestrator.set_failed(&job_id, &error);
            Err(error)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::*;
    use crate::audio::{encode_wav_pcm16, secs_to_samples};
    use crate::config::VoiceConfig;
    use crate::pipeline::state::{ErrorKind, JobStatus, PROGRESS_FLOOR};
    use crate::synthesis::{SynthesisError, VoiceConditioning};
    use crate::pipeline::store::InMemoryJobStore;
    use crate::synthesis::MockSynthesizer;
    use crate::voice::{FsObjectStore, InMemoryVoiceRepository, VoiceRecord, VoiceRepository};

    const TEXT: &str = "The quick brown fox jumps over the lazy dog. \
                        A second sentence follows right after it.";

    struct Fixture {
        _dir: TempDir,
        jobs: Arc<InMemoryJobStore>,
        service: NarrationService,
        voice: VoiceRecord,
    }

    async fn fixture(synth: MockSynthesizer) -> Fixture {
        fixture_with(Arc::new(synth)).await
    }

    async fn fixture_with(synth: Arc<dyn Synthesizer>) -> Fixture {
        let dir = TempDir::new().unwrap();
        let library = Arc::new(VoiceLibrary::new(
            Arc::new(InMemoryVoiceRepository::new()),
            Arc::new(FsObjectStore::new(dir.path(), "/output")),
            &VoiceConfig::default(),
        ));
        let sample = encode_wav_pcm16(&vec![0.3; secs_to_samples(4.0, 24_000)], 24_000).unwrap();
        let voice = library.register(7, "narrator", &sample).await.unwrap();

        let jobs = Arc::new(InMemoryJobStore::new());
        let service = NarrationService::new(
            jobs.clone(),
            library,
            synth,
            PipelineSettings::default(),
        );
        Fixture {
            _dir: dir,
            jobs,
            service,
            voice,
        }
    }

    fn submit_request(voice_id: i64, text: &str) -> SubmitRequest {
        SubmitRequest {
            text: text.into(),
            voice_id,
            user_id: Some(7),
            params: SynthesisParams::default(),
        }
    }

    #[tokio::test]
    async fn submitted_job_runs_to_completion() {
        let f = fixture(MockSynthesizer::ok(24_000, 240)).await;

        let handle = f
            .service
            .submit(submit_request(f.voice.voice_id, TEXT))
            .await
            .unwrap();
        let id = handle.id.clone();
        let outcome = handle.wait().await.unwrap();

        let view = f.service.status(&id).unwrap();
        assert_eq!(view.status, JobStatus::Completed);
        assert_eq!(view.progress, 100);
        assert_eq!(view.audio_url, Some(outcome.audio_url.clone()));
        assert_eq!(outcome.audio_url, format!("/output/audio/{id}.wav"));
        assert!(view.error.is_none());

        let voice = f
            .service
            .library()
            .repository()
            .get(f.voice.voice_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(voice.usage_count, 1);
    }

    #[tokio::test]
    async fn blank_text_is_rejected_without_creating_a_job() {
        let f = fixture(MockSynthesizer::ok(24_000, 240)).await;

        let err = f
            .service
            .submit(submit_request(f.voice.voice_id, "  \n\t "))
            .await
            .err()
            .unwrap();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(f.jobs.is_empty());
    }

    #[tokio::test]
    async fn out_of_range_params_are_rejected() {
        let f = fixture(MockSynthesizer::ok(24_000, 240)).await;
        let mut req = submit_request(f.voice.voice_id, TEXT);
        req.params.temperature = 9.0;

        let err = f.service.submit(req).await.err().unwrap();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("temperature"));
        assert!(f.jobs.is_empty());
    }

    #[tokio::test]
    async fn unknown_or_foreign_voice_is_rejected() {
        let f = fixture(MockSynthesizer::ok(24_000, 240)).await;

        let err = f.service.submit(submit_request(999, TEXT)).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let mut req = submit_request(f.voice.voice_id, TEXT);
        req.user_id = Some(8);
        let err = f.service.submit(req).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(f.jobs.is_empty());
    }

    #[tokio::test]
    async fn failed_job_surfaces_error_in_status() {
        let f = fixture(MockSynthesizer::ok(24_000, 240)).await;

        let handle = f
            .service
            .submit(submit_request(f.voice.voice_id, "A. "))
            .await
            .unwrap();
        let id = handle.id.clone();
        assert!(handle.wait().await.is_err());

        let view = f.service.status(&id).unwrap();
        assert_eq!(view.status, JobStatus::Failed);
        assert_eq!(view.error.as_deref(), Some("no audio generated"));
        assert_eq!(view.error_kind, Some(ErrorKind::NoAudio));
        assert!(view.audio_url.is_none());
    }

    #[tokio::test]
    async fn concurrent_jobs_are_isolated() {
        let f = fixture(MockSynthesizer::ok(24_000, 240)).await;

        let a = f
            .service
            .submit(submit_request(f.voice.voice_id, TEXT))
            .await
            .unwrap();
        let b = f
            .service
            .submit(submit_request(f.voice.voice_id, "A. "))
            .await
            .unwrap();
        assert_ne!(a.id, b.id);
        let (ida, idb) = (a.id.clone(), b.id.clone());

        let (ra, rb) = tokio::join!(a.wait(), b.wait());
        assert!(ra.is_ok());
        assert!(rb.is_err());
        assert_eq!(f.service.status(&ida).unwrap().status, JobStatus::Completed);
        assert_eq!(f.service.status(&idb).unwrap().status, JobStatus::Failed);
    }

    /// Panics on the first chunk.
    struct PanickingSynthesizer;

    #[async_trait]
    impl Synthesizer for PanickingSynthesizer {
        async fn synthesize(
            &self,
            _text: &str,
            _voice: &VoiceConditioning,
            _params: &SynthesisParams,
        ) -> Result<Vec<u8>, SynthesisError> {
            panic!("synthesizer blew up");
        }
    }

    #[tokio::test]
    async fn panicking_job_is_marked_failed() {
        let f = fixture_with(Arc::new(PanickingSynthesizer)).await;

        let handle = f
            .service
            .submit(submit_request(f.voice.voice_id, TEXT))
            .await
            .unwrap();
        let id = handle.id.clone();
        let err = handle.wait().await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Internal);

        let view = f.service.status(&id).unwrap();
        assert!(view.status.is_terminal());
        assert_eq!(view.status, JobStatus::Failed);
        assert_eq!(view.error_kind, Some(ErrorKind::Internal));
        assert_eq!(view.error.as_deref(), Some("job task aborted: job task panicked"));
        assert_eq!(view.progress, PROGRESS_FLOOR);
        assert!(view.audio_url.is_none());
    }

    #[tokio::test]
    async fn unknown_job_has_no_status() {
        let f = fixture(MockSynthesizer::ok(24_000, 240)).await;
        assert!(f.service.status("missing").is_none());
    }
}

//! Narration job state machine.
//!
//! [`SynthesisJob`] is the tracker entry for one narration request.  Its
//! transition methods enforce the lifecycle; the orchestrator task that owns
//! the job is the only caller.
//!
//! [`JobStatusView`] is the caller-facing projection returned by status
//! queries.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Progress reported once voice preparation starts.
pub const PROGRESS_FLOOR: u8 = 5;
/// Upper end of the band chunk synthesis advances through.
pub const PROGRESS_CEILING: u8 = 90;

// ---------------------------------------------------------------------------
// JobStatus
// ---------------------------------------------------------------------------

/// Lifecycle of a narration job.
///
/// ```text
/// Queued ──start──▶ Processing ──advance*──▶ Processing
///                        ├──complete──▶ Completed
///                        └──fail──────▶ Failed
/// Queued ──fail──▶ Failed
/// Completed / Failed: terminal, never change again
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// ```
    /// use voice_narrator::pipeline::JobStatus;
    ///
    /// assert!(!JobStatus::Queued.is_terminal());
    /// assert!(!JobStatus::Processing.is_terminal());
    /// assert!(JobStatus::Completed.is_terminal());
    /// assert!(JobStatus::Failed.is_terminal());
    /// ```
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// Category of a job failure, reported alongside the error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input; rejected before any remote call.
    Validation,
    /// Every chunk was skipped, so nothing was synthesized.
    NoAudio,
    /// Network failure or non-success HTTP status.
    Transport,
    /// Malformed remote response or remote-reported failure.
    Protocol,
    /// Polling budget spent while the remote job was still pending.
    Timeout,
    /// Undecodable audio or a sample-rate mismatch.
    Data,
    /// Object store or record store failure.
    Storage,
    /// The job task itself died.
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NoAudio => "no_audio",
            ErrorKind::Transport => "transport",
            ErrorKind::Protocol => "protocol",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Data => "data",
            ErrorKind::Storage => "storage",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// JobStateError
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Clone, PartialEq)]
pub enum JobStateError {
    #[error("job is {0} and can no longer change")]
    Terminal(JobStatus),

    #[error("cannot {action} a job that is {status}")]
    InvalidTransition {
        action: &'static str,
        status: JobStatus,
    },
}

// ---------------------------------------------------------------------------
// SynthesisJob
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisJob {
    pub id: String,
    pub status: JobStatus,
    /// 0–100, never decreases.
    pub progress: u8,
    /// Set only when completed.
    pub audio_url: Option<String>,
    /// Length of the rendered audio; set only when completed.
    pub duration_secs: Option<f32>,
    /// Set only when failed.
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
}

impl SynthesisJob {
    /// A freshly accepted job: queued at 0 %.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Queued,
            progress: 0,
            audio_url: None,
            duration_secs: None,
            error: None,
            error_kind: None,
        }
    }

    fn ensure_active(&self) -> Result<(), JobStateError> {
        if self.status.is_terminal() {
            Err(JobStateError::Terminal(self.status))
        } else {
            Ok(())
        }
    }

    /// Enter `Processing` with progress raised to at least `floor`.
    pub fn start_processing(&mut self, floor: u8) -> Result<(), JobStateError> {
        self.ensure_active()?;
        self.status = JobStatus::Processing;
        self.progress = self.progress.max(floor.min(100));
        Ok(())
    }

    /// Raise progress; lower values are ignored.
    pub fn advance(&mut self, progress: u8) -> Result<(), JobStateError> {
        self.ensure_active()?;
        if self.status != JobStatus::Processing {
            return Err(JobStateError::InvalidTransition {
                action: "advance",
                status: self.status,
            });
        }
        self.progress = self.progress.max(progress.min(100));
        Ok(())
    }

    pub fn complete(
        &mut self,
        audio_url: impl Into<String>,
        duration_secs: f32,
    ) -> Result<(), JobStateError> {
        self.ensure_active()?;
        if self.status != JobStatus::Processing {
            return Err(JobStateError::InvalidTransition {
                action: "complete",
                status: self.status,
            });
        }
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.audio_url = Some(audio_url.into());
        self.duration_secs = Some(duration_secs);
        Ok(())
    }

    /// Mark failed; progress keeps its last value.
    pub fn fail(&mut self, kind: ErrorKind, message: impl Into<String>) -> Result<(), JobStateError> {
        self.ensure_active()?;
        self.status = JobStatus::Failed;
        self.error = Some(message.into());
        self.error_kind = Some(kind);
        Ok(())
    }

    pub fn view(&self) -> JobStatusView {
        JobStatusView {
            status: self.status,
            progress: self.progress,
            audio_url: self.audio_url.clone(),
            duration_secs: self.duration_secs,
            error: self.error.clone(),
            error_kind: self.error_kind,
        }
    }
}

/// Progress after `completed` of `total` chunks, mapped into
/// [`PROGRESS_FLOOR`]..=[`PROGRESS_CEILING`].
///
/// ```
/// use voice_narrator::pipeline::progress_for;
///
/// assert_eq!(progress_for(0, 4), 5);
/// assert_eq!(progress_for(2, 4), 47);
/// assert_eq!(progress_for(4, 4), 90);
/// ```
pub fn progress_for(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return PROGRESS_FLOOR;
    }
    let band = usize::from(PROGRESS_CEILING - PROGRESS_FLOOR);
    let done = completed.min(total);
    PROGRESS_FLOOR + (band * done / total) as u8
}

// ---------------------------------------------------------------------------
// JobStatusView
// ---------------------------------------------------------------------------

/// What a status query returns: `{status, progress, audio_url?, error?, …}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusView {
    pub status: JobStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn processing_job() -> SynthesisJob {
        let mut job = SynthesisJob::new("job-1");
        job.start_processing(PROGRESS_FLOOR).unwrap();
        job
    }

    #[test]
    fn new_job_is_queued_at_zero() {
        let job = SynthesisJob::new("job-1");
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress, 0);
        assert!(job.audio_url.is_none() && job.error.is_none());
    }

    #[test]
    fn start_processing_sets_floor() {
        let job = processing_job();
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.progress, 5);
    }

    #[test]
    fn advance_never_decreases_progress() {
        let mut job = processing_job();
        job.advance(40).unwrap();
        job.advance(20).unwrap();
        assert_eq!(job.progress, 40);
        job.advance(250).unwrap();
        assert_eq!(job.progress, 100);
    }

    #[test]
    fn advance_requires_processing() {
        let mut job = SynthesisJob::new("job-1");
        assert_eq!(
            job.advance(10),
            Err(JobStateError::InvalidTransition {
                action: "advance",
                status: JobStatus::Queued
            })
        );
    }

    #[test]
    fn complete_sets_location_and_full_progress() {
        let mut job = processing_job();
        job.complete("/output/audio/job-1.wav", 3.5).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert_eq!(job.audio_url.as_deref(), Some("/output/audio/job-1.wav"));
        assert!(job.error.is_none());
    }

    #[test]
    fn fail_keeps_last_progress() {
        let mut job = processing_job();
        job.advance(47).unwrap();
        job.fail(ErrorKind::Timeout, "remote job still pending").unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.progress, 47);
        assert_eq!(job.error_kind, Some(ErrorKind::Timeout));
        assert!(job.audio_url.is_none());
    }

    #[test]
    fn queued_job_can_fail_directly() {
        let mut job = SynthesisJob::new("job-1");
        job.fail(ErrorKind::Validation, "empty text").unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.progress, 0);
    }

    #[test]
    fn terminal_states_are_immutable() {
        let mut done = processing_job();
        done.complete("/output/a.wav", 1.0).unwrap();
        let snapshot = done.clone();
        assert_eq!(
            done.fail(ErrorKind::Data, "late"),
            Err(JobStateError::Terminal(JobStatus::Completed))
        );
        assert!(done.advance(50).is_err());
        assert!(done.start_processing(5).is_err());
        assert_eq!(done, snapshot);

        let mut failed = processing_job();
        failed.fail(ErrorKind::Data, "bad").unwrap();
        assert_eq!(
            failed.complete("/output/a.wav", 1.0),
            Err(JobStateError::Terminal(JobStatus::Failed))
        );
    }

    #[test]
    fn progress_band_mapping() {
        assert_eq!(progress_for(0, 0), 5);
        assert_eq!(progress_for(1, 1), 90);
        assert_eq!(progress_for(1, 3), 33);
        assert_eq!(progress_for(9, 3), 90);
        let steps: Vec<u8> = (0..=7).map(|i| progress_for(i, 7)).collect();
        assert!(steps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn view_omits_unset_fields() {
        let job = processing_job();
        assert_eq!(
            serde_json::to_value(job.view()).unwrap(),
            json!({ "status": "processing", "progress": 5 })
        );

        let mut failed = processing_job();
        failed.fail(ErrorKind::NoAudio, "no audio generated").unwrap();
        assert_eq!(
            serde_json::to_value(failed.view()).unwrap(),
            json!({
                "status": "failed",
                "progress": 5,
                "error": "no audio generated",
                "error_kind": "no_audio"
            })
        );
    }
}

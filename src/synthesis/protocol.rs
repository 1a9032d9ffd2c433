//! Wire format of the serverless synthesis endpoint.
//!
//! Request:
//!
//! ```json
//! { "input": { "task": "tts", "text": "…", "ref_audio_b64": "…",
//!              "exaggeration": 0.3, "temperature": 0.85, "cfg_weight": 0.2 } }
//! ```
//!
//! Response, either settled synchronously or queued for polling:
//!
//! ```json
//! { "id": "job-1", "status": "COMPLETED", "output": { "audio_b64": "…", "sample_rate": 24000 } }
//! { "id": "job-1", "status": "IN_QUEUE" }
//! ```

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::synthesis::client::SynthesisError;
use crate::synthesis::params::{SynthesisParams, VoiceConditioning};

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct RunRequest<'a> {
    pub input: TtsInput<'a>,
}

#[derive(Debug, Serialize)]
pub struct TtsInput<'a> {
    pub task: &'static str,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_audio_b64: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker_embedding: Option<&'a serde_json::Value>,
    pub exaggeration: f32,
    pub temperature: f32,
    pub cfg_weight: f32,
}

impl<'a> RunRequest<'a> {
    pub fn tts(text: &'a str, voice: &'a VoiceConditioning, params: &SynthesisParams) -> Self {
        let (ref_audio_b64, speaker_embedding) = match voice {
            VoiceConditioning::ReferenceAudio { b64 } => (Some(b64.as_str()), None),
            VoiceConditioning::SpeakerEmbedding(embedding) => (None, Some(embedding)),
        };
        Self {
            input: TtsInput {
                task: "tts",
                text,
                ref_audio_b64,
                speaker_embedding,
                exaggeration: params.exaggeration,
                temperature: params.temperature,
                cfg_weight: params.cfg_weight,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// Remote job lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteStatus {
    InQueue,
    InProgress,
    Completed,
    Failed,
    Cancelled,
    TimedOut,
    #[serde(other)]
    Unknown,
}

impl RemoteStatus {
    /// `true` while the remote job may still complete.
    pub fn is_pending(self) -> bool {
        matches!(self, RemoteStatus::InQueue | RemoteStatus::InProgress)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RemoteStatus::InQueue => "IN_QUEUE",
            RemoteStatus::InProgress => "IN_PROGRESS",
            RemoteStatus::Completed => "COMPLETED",
            RemoteStatus::Failed => "FAILED",
            RemoteStatus::Cancelled => "CANCELLED",
            RemoteStatus::TimedOut => "TIMED_OUT",
            RemoteStatus::Unknown => "UNKNOWN",
        }
    }
}

/// Body of both the submit and the status endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResponse {
    #[serde(default)]
    pub id: Option<String>,
    pub status: RemoteStatus,
    #[serde(default)]
    pub output: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
    #[serde(default, rename = "executionTime")]
    pub execution_time_ms: Option<u64>,
    #[serde(default, rename = "delayTime")]
    pub delay_time_ms: Option<u64>,
}

/// Successful `output` object.
#[derive(Debug, Clone, Deserialize)]
pub struct SynthesisOutput {
    pub audio_b64: String,
    #[serde(default)]
    pub sample_rate: Option<u32>,
}

impl JobResponse {
    pub fn pending(id: impl Into<String>, status: RemoteStatus) -> Self {
        Self {
            id: Some(id.into()),
            status,
            output: None,
            error: None,
            execution_time_ms: None,
            delay_time_ms: None,
        }
    }

    pub fn completed(id: impl Into<String>, output: serde_json::Value) -> Self {
        Self {
            output: Some(output),
            ..Self::pending(id, RemoteStatus::Completed)
        }
    }

    /// Human-readable failure detail reported by the remote side, if any.
    ///
    /// Looks at the top-level `error` first, then at `output.error` (handlers
    /// report their own failures inside a `COMPLETED` envelope).
    pub fn failure_detail(&self) -> Option<String> {
        let from_output = self.output.as_ref().and_then(|o| o.get("error"));
        self.error
            .as_ref()
            .or(from_output)
            .filter(|v| !v.is_null())
            .map(|v| match v.as_str() {
                Some(s) => s.to_string(),
                None => v.to_string(),
            })
    }

    /// Decode the audio payload of a completed job.
    pub fn audio_bytes(&self) -> Result<Vec<u8>, SynthesisError> {
        let output = self
            .output
            .clone()
            .ok_or_else(|| SynthesisError::Protocol("response has no output".into()))?;
        let output: SynthesisOutput = serde_json::from_value(output)
            .map_err(|e| SynthesisError::Protocol(format!("output missing audio_b64: {e}")))?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(output.audio_b64.trim())
            .map_err(|e| SynthesisError::Protocol(format!("audio_b64 is not base64: {e}")))?;
        if bytes.is_empty() {
            return Err(SynthesisError::Protocol("audio_b64 is empty".into()));
        }
        Ok(bytes)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

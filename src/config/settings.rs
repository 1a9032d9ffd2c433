//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across tasks.
//! Every section is `#[serde(default)]`, so a partial `settings.toml` only
//! overrides the keys it names.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use super::AppPaths;

/// Environment variable that overrides [`RemoteConfig::api_key`].
pub const API_KEY_ENV: &str = "RUNPOD_API_KEY";
/// Environment variable that overrides [`RemoteConfig::endpoint_id`].
pub const ENDPOINT_ID_ENV: &str = "RUNPOD_ENDPOINT_ID";

// ---------------------------------------------------------------------------
// RemoteConfig
// ---------------------------------------------------------------------------

/// Connection settings for the serverless synthesis endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the serverless API, without the endpoint id.
    pub base_url: String,
    /// Serverless endpoint identifier appended to `base_url`.
    pub endpoint_id: String,
    /// Bearer token.  `None` (or empty) sends no `Authorization` header.
    pub api_key: Option<String>,
    /// Transport timeout for the initial synchronous submit call.
    pub submit_timeout_secs: u64,
    /// Transport timeout for each status poll.
    pub poll_timeout_secs: u64,
    /// Delay between two status polls.
    pub poll_interval_ms: u64,
    /// Number of status polls before the job is reported as timed out.
    pub max_poll_attempts: u32,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.runpod.ai/v2".into(),
            endpoint_id: String::new(),
            api_key: None,
            submit_timeout_secs: 600,
            poll_timeout_secs: 30,
            poll_interval_ms: 1_200,
            max_poll_attempts: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// SynthesisDefaults
// ---------------------------------------------------------------------------

/// Generation-control defaults applied when a request leaves a knob unset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisDefaults {
    pub exaggeration: f32,
    pub temperature: f32,
    pub cfg_weight: f32,
}

impl Default for SynthesisDefaults {
    fn default() -> Self {
        Self {
            exaggeration: 0.3,
            temperature: 0.85,
            cfg_weight: 0.2,
        }
    }
}

// ---------------------------------------------------------------------------
// ChunkerConfig
// ---------------------------------------------------------------------------

/// Text chunking limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Character budget per chunk.  A single longer sentence still forms
    /// its own chunk.
    pub max_chars: usize,
    /// Chunks shorter than this (after trimming) are skipped, not sent.
    pub min_chunk_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chars: 240,
            min_chunk_chars: 20,
        }
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Output waveform settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate the remote model produces.  Decoded chunks at any other
    /// rate are rejected.
    pub sample_rate: u32,
    /// Silence appended after every synthesized chunk.
    pub sentence_pause_secs: f32,
    /// Extra silence appended after every `paragraph_every`-th segment.
    pub paragraph_pause_secs: f32,
    /// Segment period of the paragraph pause.  `0` disables it.
    pub paragraph_every: usize,
    /// Scale the final waveform so its peak equals this value.
    pub normalize_peak: Option<f32>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 24_000,
            sentence_pause_secs: 0.35,
            paragraph_pause_secs: 0.9,
            paragraph_every: 4,
            normalize_peak: None,
        }
    }
}

// ---------------------------------------------------------------------------
// StorageConfig
// ---------------------------------------------------------------------------

/// Filesystem object store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory for stored objects.
    pub root: PathBuf,
    /// Prefix of the public location returned for stored objects.
    pub url_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: AppPaths::new().storage_dir,
            url_prefix: "/output".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// VoiceConfig
// ---------------------------------------------------------------------------

/// Voice sample upload rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Samples shorter than this are rejected.
    pub min_duration_secs: f32,
    /// Samples longer than this are cropped.
    pub max_duration_secs: f32,
    /// Owner id whose voices every user may use.
    pub shared_owner_id: i64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            min_duration_secs: 3.0,
            max_duration_secs: 15.0,
            shared_owner_id: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use voice_narrator::config::AppConfig;
///
/// // Load (returns Default when file is missing), then apply env overrides.
/// let mut config = AppConfig::load().unwrap();
/// config.apply_env_overrides();
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub remote: RemoteConfig,
    pub synthesis: SynthesisDefaults,
    pub chunker: ChunkerConfig,
    pub audio: AudioConfig,
    pub storage: StorageConfig,
    pub voice: VoiceConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Overlay credentials from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(API_KEY_ENV).filter(|v| !v.is_empty()) {
            self.remote.api_key = Some(key);
        }
        if let Some(id) = lookup(ENDPOINT_ID_ENV).filter(|v| !v.is_empty()) {
            self.remote.endpoint_id = id;
        }
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            bail!("audio.sample_rate must be > 0");
        }
        if self.chunker.max_chars == 0 {
            bail!("chunker.max_chars must be > 0");
        }
        if self.remote.max_poll_attempts == 0 {
            bail!("remote.max_poll_attempts must be > 0");
        }
        if self.remote.poll_interval_ms == 0 {
            bail!("remote.poll_interval_ms must be > 0");
        }
        if self.audio.sentence_pause_secs < 0.0 || self.audio.paragraph_pause_secs < 0.0 {
            bail!("audio pauses must not be negative");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Generation-control knobs and voice conditioning sent with every request.

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SynthesisDefaults;

// ---------------------------------------------------------------------------
// ParamError
// ---------------------------------------------------------------------------

/// A generation knob is non-finite or outside its accepted range.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{name} must be within [{min}, {max}], got {value}")]
pub struct ParamError {
    pub name: &'static str,
    pub value: f32,
    pub min: f32,
    pub max: f32,
}

// ---------------------------------------------------------------------------
// SynthesisParams
// ---------------------------------------------------------------------------

/// Semantic generation controls forwarded to the model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SynthesisParams {
    /// Emotional intensity of the delivery.
    pub exaggeration: f32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Classifier-free guidance weight.
    pub cfg_weight: f32,
}

impl SynthesisParams {
    pub const EXAGGERATION_RANGE: (f32, f32) = (0.0, 2.0);
    pub const TEMPERATURE_RANGE: (f32, f32) = (0.05, 5.0);
    pub const CFG_WEIGHT_RANGE: (f32, f32) = (0.0, 2.0);

    /// Start from `defaults` and replace every knob the caller supplied.
    pub fn resolve(
        defaults: &SynthesisDefaults,
        exaggeration: Option<f32>,
        temperature: Option<f32>,
        cfg_weight: Option<f32>,
    ) -> Self {
        Self {
            exaggeration: exaggeration.unwrap_or(defaults.exaggeration),
            temperature: temperature.unwrap_or(defaults.temperature),
            cfg_weight: cfg_weight.unwrap_or(defaults.cfg_weight),
        }
    }

    pub fn validate(&self) -> Result<(), ParamError> {
        check("exaggeration", self.exaggeration, Self::EXAGGERATION_RANGE)?;
        check("temperature", self.temperature, Self::TEMPERATURE_RANGE)?;
        check("cfg_weight", self.cfg_weight, Self::CFG_WEIGHT_RANGE)?;
        Ok(())
    }
}

impl From<&SynthesisDefaults> for SynthesisParams {
    fn from(d: &SynthesisDefaults) -> Self {
        Self {
            exaggeration: d.exaggeration,
            temperature: d.temperature,
            cfg_weight: d.cfg_weight,
        }
    }
}

impl Default for SynthesisParams {
    fn default() -> Self {
        Self::from(&SynthesisDefaults::default())
    }
}

fn check(name: &'static str, value: f32, (min, max): (f32, f32)) -> Result<(), ParamError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ParamError {
            name,
            value,
            min,
            max,
        })
    }
}

// ---------------------------------------------------------------------------
// VoiceConditioning
// ---------------------------------------------------------------------------

/// Timbre reference passed by value on every request; the remote service
/// keeps no state between calls.
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceConditioning {
    /// Base64-encoded reference recording.
    ReferenceAudio { b64: String },
    /// Pre-extracted speaker embedding, forwarded as-is.
    SpeakerEmbedding(serde_json::Value),
}

impl VoiceConditioning {
    /// Encode a reference recording once so every chunk request can reuse it.
    pub fn reference_audio(bytes: &[u8]) -> Self {
        Self::ReferenceAudio {
            b64: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

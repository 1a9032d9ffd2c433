//! Voice sample preparation for uploads.
//!
//! [`VoiceSampleCheck`] validates an uploaded reference clip and conditions
//! it for cloning:
//!
//! | Step      | Rule                                               |
//! |-----------|----------------------------------------------------|
//! | Duration  | Shorter than `min_secs` is rejected                |
//! | Silence   | Peak amplitude below `silence_threshold` rejected  |
//! | Crop      | Longer than `max_secs` is cut to `max_secs`        |
//! | Normalise | Peak scaled to `target_peak`                       |
//!
//! ```rust
//! use voice_narrator::audio::{AudioError, AudioSegment, VoiceSampleCheck};
//!
//! let check = VoiceSampleCheck::new(3.0, 15.0);
//! let short = AudioSegment::new(vec![0.2; 16_000], 16_000); // 1 s
//! assert!(matches!(check.prepare(short), Err(AudioError::TooShort { .. })));
//! ```

use crate::audio::decode::{secs_to_samples, AudioSegment};
use crate::audio::encode::normalize_peak;
use crate::audio::error::AudioError;
use crate::config::VoiceConfig;

#[derive(Debug, Clone, Copy)]
pub struct VoiceSampleCheck {
    pub min_secs: f32,
    pub max_secs: f32,
    pub silence_threshold: f32,
    pub target_peak: f32,
}

impl Default for VoiceSampleCheck {
    fn default() -> Self {
        Self::from_config(&VoiceConfig::default())
    }
}

impl VoiceSampleCheck {
    /// Create a check with the given duration limits and default thresholds.
    pub fn new(min_secs: f32, max_secs: f32) -> Self {
        Self {
            min_secs,
            max_secs,
            silence_threshold: 0.01,
            target_peak: 0.95,
        }
    }

    pub fn from_config(config: &VoiceConfig) -> Self {
        Self::new(config.min_duration_secs, config.max_duration_secs)
    }

    /// Validate `sample`, then crop and normalise it.
    pub fn prepare(&self, mut sample: AudioSegment) -> Result<AudioSegment, AudioError> {
        let got_secs = sample.duration_secs();
        if got_secs < self.min_secs {
            return Err(AudioError::TooShort {
                min_secs: self.min_secs,
                got_secs,
            });
        }

        let amplitude = sample
            .samples
            .iter()
            .map(|s| s.abs())
            .fold(0.0_f32, f32::max);
        if amplitude < self.silence_threshold {
            return Err(AudioError::TooQuiet {
                amplitude,
                threshold: self.silence_threshold,
            });
        }

        let max_len = secs_to_samples(self.max_secs, sample.sample_rate);
        if sample.len() > max_len {
            log::info!(
                "voice: cropping sample from {:.2}s to {:.2}s",
                got_secs,
                self.max_secs
            );
            sample.samples.truncate(max_len);
        }

        normalize_peak(&mut sample.samples, self.target_peak);
        Ok(sample)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

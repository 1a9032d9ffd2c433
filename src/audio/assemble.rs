//! Stitching decoded chunk segments into one continuous waveform.
//!
//! Every appended segment is followed by a sentence pause; every
//! `paragraph_every`-th segment additionally gets a paragraph pause.
//! Segments are appended strictly in the order they are pushed, so the
//! caller's chunk order is the waveform order.
//!
//! ```text
//! seg1 ▸ pause ▸ seg2 ▸ pause ▸ seg3 ▸ pause ▸ seg4 ▸ pause + paragraph ▸ …
//! ```

use crate::audio::decode::{secs_to_samples, AudioSegment};
use crate::audio::error::AudioError;
use crate::config::AudioConfig;

// ---------------------------------------------------------------------------
// PauseSchedule
// ---------------------------------------------------------------------------

/// Silence inserted after each segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PauseSchedule {
    pub sentence_pause_secs: f32,
    pub paragraph_pause_secs: f32,
    /// `0` disables paragraph pauses.
    pub paragraph_every: usize,
}

impl PauseSchedule {
    pub fn from_config(config: &AudioConfig) -> Self {
        Self {
            sentence_pause_secs: config.sentence_pause_secs,
            paragraph_pause_secs: config.paragraph_pause_secs,
            paragraph_every: config.paragraph_every,
        }
    }

    /// No silence at all.
    pub fn none() -> Self {
        Self {
            sentence_pause_secs: 0.0,
            paragraph_pause_secs: 0.0,
            paragraph_every: 0,
        }
    }

    /// Silence (in samples) following the `ordinal`-th segment (1-based).
    pub fn silence_after(&self, ordinal: usize, sample_rate: u32) -> usize {
        let mut samples = secs_to_samples(self.sentence_pause_secs, sample_rate);
        if self.paragraph_every > 0 && ordinal % self.paragraph_every == 0 {
            samples += secs_to_samples(self.paragraph_pause_secs, sample_rate);
        }
        samples
    }
}

impl Default for PauseSchedule {
    fn default() -> Self {
        Self::from_config(&AudioConfig::default())
    }
}

// ---------------------------------------------------------------------------
// WaveformAssembler
// ---------------------------------------------------------------------------

/// Accumulates segments and silence into one waveform.
#[derive(Debug)]
pub struct WaveformAssembler {
    sample_rate: u32,
    schedule: PauseSchedule,
    samples: Vec<f32>,
    segments: usize,
    silence_samples: usize,
}

impl WaveformAssembler {
    pub fn new(sample_rate: u32, schedule: PauseSchedule) -> Self {
        Self {
            sample_rate,
            schedule,
            samples: Vec::new(),
            segments: 0,
            silence_samples: 0,
        }
    }

    /// Append `segment` followed by its scheduled silence.
    pub fn push(&mut self, segment: &AudioSegment) -> Result<(), AudioError> {
        if segment.sample_rate != self.sample_rate {
            return Err(AudioError::SampleRateMismatch {
                expected: self.sample_rate,
                actual: segment.sample_rate,
            });
        }

        self.segments += 1;
        let silence = self.schedule.silence_after(self.segments, self.sample_rate);

        self.samples.reserve(segment.len() + silence);
        self.samples.extend_from_slice(&segment.samples);
        self.samples.resize(self.samples.len() + silence, 0.0);
        self.silence_samples += silence;

        Ok(())
    }

    /// Number of segments appended so far.
    pub fn segment_count(&self) -> usize {
        self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments == 0
    }

    /// Total inserted silence, in samples.
    pub fn silence_samples(&self) -> usize {
        self.silence_samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn finish(self) -> AudioSegment {
        AudioSegment::new(self.samples, self.sample_rate)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 24_000;

    fn seg(value: f32, len: usize) -> AudioSegment {
        AudioSegment::new(vec![value; len], RATE)
    }

    fn schedule() -> PauseSchedule {
        PauseSchedule {
            sentence_pause_secs: 0.001, // 24 samples
            paragraph_pause_secs: 0.002, // 48 samples
            paragraph_every: 2,
        }
    }

    fn assemble(segments: &[AudioSegment], schedule: PauseSchedule) -> AudioSegment {
        let mut assembler = WaveformAssembler::new(RATE, schedule);
        for segment in segments {
            assembler.push(segment).unwrap();
        }
        assembler.finish()
    }

    #[test]
    fn segments_and_silence_appear_in_push_order() {
        let (a, b, c) = (seg(0.1, 10), seg(0.2, 20), seg(0.3, 30));
        let out = assemble(&[a.clone(), b.clone(), c.clone()], schedule());

        let mut expected = Vec::new();
        expected.extend(&a.samples);
        expected.extend(vec![0.0; 24]);
        expected.extend(&b.samples);
        expected.extend(vec![0.0; 24 + 48]);
        expected.extend(&c.samples);
        expected.extend(vec![0.0; 24]);

        assert_eq!(out.samples, expected);
    }

    #[test]
    fn length_is_segments_plus_silence() {
        let segments: Vec<AudioSegment> = (1..=9).map(|i| seg(0.5, i * 100)).collect();
        let sched = PauseSchedule::default();

        let mut assembler = WaveformAssembler::new(RATE, sched);
        for s in &segments {
            assembler.push(s).unwrap();
        }

        let audio_len: usize = segments.iter().map(AudioSegment::len).sum();
        let silence: usize = (1..=9).map(|i| sched.silence_after(i, RATE)).sum();
        assert_eq!(assembler.silence_samples(), silence);
        assert_eq!(assembler.segment_count(), 9);
        assert_eq!(assembler.finish().len(), audio_len + silence);
    }

    #[test]
    fn default_schedule_adds_paragraph_pause_every_fourth_segment() {
        let sched = PauseSchedule::default();
        assert_eq!(sched.silence_after(1, RATE), 8_400);
        assert_eq!(sched.silence_after(3, RATE), 8_400);
        assert_eq!(sched.silence_after(4, RATE), 8_400 + 21_600);
        assert_eq!(sched.silence_after(8, RATE), 8_400 + 21_600);
    }

    #[test]
    fn disabled_paragraphs_only_use_sentence_pause() {
        let sched = PauseSchedule {
            paragraph_every: 0,
            ..PauseSchedule::default()
        };
        assert_eq!(sched.silence_after(4, RATE), 8_400);
    }

    #[test]
    fn foreign_rate_segment_is_rejected() {
        let mut assembler = WaveformAssembler::new(RATE, PauseSchedule::none());
        let err = assembler
            .push(&AudioSegment::new(vec![0.0; 10], 16_000))
            .unwrap_err();
        assert!(matches!(err, AudioError::SampleRateMismatch { .. }));
        assert!(assembler.is_empty());
    }

    #[test]
    fn empty_input_yields_empty_waveform() {
        let out = assemble(&[], PauseSchedule::default());
        assert!(out.is_empty());
    }
}

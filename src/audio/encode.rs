//! 16-bit PCM WAV output.

use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::audio::error::AudioError;

/// Convert `f32` samples to `i16`, clamping to `[-1.0, 1.0]`.
pub fn f32_to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&x| {
            let x = x.clamp(-1.0, 1.0);
            // -1.0 -> -32768, +1.0 -> 32767
            if x >= 0.0 {
                (x * 32767.0).round() as i16
            } else {
                (x * 32768.0).round() as i16
            }
        })
        .collect()
}

/// Encode mono `samples` as a 16-bit PCM WAV file.
pub fn encode_wav_pcm16(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, AudioError> {
    if sample_rate == 0 {
        return Err(AudioError::Encode("sample_rate must be > 0".into()));
    }
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut buf = Cursor::new(Vec::<u8>::new());
    {
        let mut writer =
            WavWriter::new(&mut buf, spec).map_err(|e| AudioError::Encode(e.to_string()))?;
        for s in f32_to_pcm16(samples) {
            writer
                .write_sample(s)
                .map_err(|e| AudioError::Encode(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| AudioError::Encode(e.to_string()))?;
    }
    Ok(buf.into_inner())
}

/// Scale `samples` in place so the absolute peak equals `target`.
///
/// Silent input is left untouched.
pub fn normalize_peak(samples: &mut [f32], target: f32) {
    let peak = samples.iter().map(|s| s.abs()).fold(0.0_f32, f32::max);
    if peak <= 0.0 {
        return;
    }
    let gain = target / peak;
    for s in samples.iter_mut() {
        *s *= gain;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::WavReader;

    #[test]
    fn pcm16_output_is_readable_mono() {
        let bytes = encode_wav_pcm16(&[0.0, 0.5, -0.5, 1.0], 24_000).unwrap();
        let mut reader = WavReader::new(Cursor::new(bytes)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 24_000);
        assert_eq!(spec.bits_per_sample, 16);
        let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, vec![0, 16_384, -16_384, 32_767]);
    }

    #[test]
    fn f32_to_pcm16_clamps() {
        let pcm = f32_to_pcm16(&[-2.0, -1.0, 0.0, 1.0, 2.0]);
        assert_eq!(pcm, vec![-32_768, -32_768, 0, 32_767, 32_767]);
    }

    #[test]
    fn zero_rate_is_rejected() {
        assert!(matches!(
            encode_wav_pcm16(&[0.0], 0),
            Err(AudioError::Encode(_))
        ));
    }

    #[test]
    fn normalize_scales_to_target_peak() {
        let mut samples = vec![0.1, -0.4, 0.2];
        normalize_peak(&mut samples, 0.8);
        assert!((samples[1] + 0.8).abs() < 1e-6);
        assert!((samples[0] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn normalize_leaves_silence_alone() {
        let mut samples = vec![0.0; 4];
        normalize_peak(&mut samples, 0.95);
        assert_eq!(samples, vec![0.0; 4]);
    }
}

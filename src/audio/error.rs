use thiserror::Error;

/// Errors raised while decoding, checking, assembling or encoding audio.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AudioError {
    /// The bytes are not a readable WAV container.
    #[error("invalid WAV data: {0}")]
    InvalidContainer(String),

    /// The WAV sample encoding is not one this crate decodes.
    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// Decoded audio is not at the pipeline's fixed rate.  Never resampled.
    #[error("sample rate mismatch: expected {expected} Hz, got {actual} Hz")]
    SampleRateMismatch { expected: u32, actual: u32 },

    /// Writing the output WAV failed.
    #[error("WAV encoding failed: {0}")]
    Encode(String),

    /// Voice sample is shorter than the configured minimum.
    #[error("voice sample too short: {got_secs:.2}s (minimum {min_secs:.2}s)")]
    TooShort { min_secs: f32, got_secs: f32 },

    /// All samples are below the silence floor.
    #[error("voice sample too quiet: max amplitude {amplitude:.4} (threshold {threshold:.4})")]
    TooQuiet { amplitude: f32, threshold: f32 },
}

impl From<hound::Error> for AudioError {
    fn from(e: hound::Error) -> Self {
        match e {
            hound::Error::Unsupported => {
                AudioError::UnsupportedFormat("WAV encoding not supported".into())
            }
            other => AudioError::InvalidContainer(other.to_string()),
        }
    }
}

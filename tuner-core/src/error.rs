//! Error types for the tuner engine.

use thiserror::Error;

/// Configuration errors reported by [`crate::config::TunerConfig::validate`].
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// Only a single capture format is supported
    #[error("Unsupported sample rate: {0} Hz, only {1} Hz is supported")]
    UnsupportedSampleRate(u32, u32),

    /// The DFT window must hold an even, non-zero number of samples
    #[error("Invalid window size: {0}")]
    InvalidWindowSize(usize),

    /// The capture block length must be non-zero
    #[error("Invalid window step: {0}")]
    InvalidWindowStep(usize),

    /// At least the fundamental itself must take part in the product
    #[error("Invalid number of harmonics: {0}")]
    InvalidHarmonics(usize),

    /// Octave band edges must be at least two strictly increasing frequencies
    #[error("Invalid octave bands: {0:?}")]
    InvalidOctaveBands(Vec<f32>),

    /// A threshold or reference pitch that is negative or not finite
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: f32 },

    /// The note history must hold at least one entry
    #[error("Invalid stability depth: {0}")]
    InvalidStabilityDepth(usize),
}

/// Result type for configuration checks
pub type ConfigResult<T> = Result<T, ConfigError>;

//! # Engine Configuration
//!
//! All tunable constants of the detection pipeline live in one place and are
//! handed to the engine at construction. The defaults describe the only
//! capture format the engine supports: 48 kHz, 16-bit, mono.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// The single supported capture sample rate in Hz.
pub const SAMPLE_RATE: u32 = 48_000;

/// Default DFT window length (1 s at 48 kHz).
pub const WINDOW_SIZE: usize = 48_000;

/// Default capture block length (250 ms at 48 kHz).
pub const WINDOW_STEP: usize = 12_000;

/// Octave band edges in Hz used for adaptive noise gating.
pub const OCTAVE_BANDS: [f32; 10] = [
    50.0, 100.0, 200.0, 400.0, 800.0, 1600.0, 3200.0, 6400.0, 12800.0, 25600.0,
];

/// Configuration for the pitch detection engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    /// Capture sample rate in Hz. Must equal [`SAMPLE_RATE`].
    pub sample_rate: u32,
    /// Number of samples in the analysis window.
    pub window_size: usize,
    /// Number of samples per capture block.
    pub window_step: usize,
    /// Number of spectra multiplied together by the HPS, including the fundamental.
    pub num_harmonics: usize,
    /// Mean signal power below which a cycle is skipped.
    pub power_threshold: f32,
    /// Fraction of the band RMS a bin must exceed to survive noise gating.
    pub white_noise_threshold: f32,
    /// Frequency of A4 in Hz.
    pub concert_pitch: f32,
    /// Bins below this frequency are zeroed to remove mains hum.
    pub hum_cutoff_hz: f32,
    /// Octave band edges in Hz, strictly increasing.
    pub octave_bands: Vec<f32>,
    /// Number of identical consecutive detections required before a note is emitted.
    pub stability_depth: usize,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            window_size: WINDOW_SIZE,
            window_step: WINDOW_STEP,
            num_harmonics: 5,
            power_threshold: 1e-6,
            white_noise_threshold: 0.2,
            concert_pitch: 440.0,
            hum_cutoff_hz: 62.0,
            octave_bands: OCTAVE_BANDS.to_vec(),
            stability_depth: 2,
        }
    }
}

/// Audio format requested from a capture source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureFormat {
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub channels: u16,
    pub buffer_duration_ms: u32,
    /// Samples per delivered block.
    pub block_len: usize,
}

impl TunerConfig {
    /// Parses a JSON document and validates the result.
    ///
    /// Missing fields take their default values.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let config: TunerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the configuration describes a usable pipeline.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.sample_rate != SAMPLE_RATE {
            return Err(ConfigError::UnsupportedSampleRate(self.sample_rate, SAMPLE_RATE));
        }
        if self.window_size == 0 || self.window_size % 2 != 0 {
            return Err(ConfigError::InvalidWindowSize(self.window_size));
        }
        if self.window_step == 0 {
            return Err(ConfigError::InvalidWindowStep(self.window_step));
        }
        if self.num_harmonics == 0 {
            return Err(ConfigError::InvalidHarmonics(self.num_harmonics));
        }
        let bands_increasing = self.octave_bands.windows(2).all(|w| w[0] < w[1]);
        if self.octave_bands.len() < 2
            || !bands_increasing
            || self.octave_bands.iter().any(|b| !b.is_finite() || *b < 0.0)
        {
            return Err(ConfigError::InvalidOctaveBands(self.octave_bands.clone()));
        }
        check_non_negative("power_threshold", self.power_threshold)?;
        check_non_negative("white_noise_threshold", self.white_noise_threshold)?;
        check_non_negative("hum_cutoff_hz", self.hum_cutoff_hz)?;
        if !self.concert_pitch.is_finite() || self.concert_pitch <= 0.0 {
            return Err(ConfigError::InvalidValue {
                name: "concert_pitch",
                value: self.concert_pitch,
            });
        }
        if self.stability_depth == 0 {
            return Err(ConfigError::InvalidStabilityDepth(self.stability_depth));
        }
        Ok(())
    }

    /// Frequency width of one DFT bin in Hz.
    pub fn delta_freq(&self) -> f32 {
        self.sample_rate as f32 / self.window_size as f32
    }

    /// Length of the non-redundant half of the spectrum.
    pub fn spectrum_len(&self) -> usize {
        self.window_size / 2
    }

    /// The format a capture source is asked to deliver.
    pub fn capture_format(&self) -> CaptureFormat {
        let buffer_duration_ms =
            (self.window_step as f64 / self.sample_rate as f64 * 1000.0).round() as u32;
        CaptureFormat {
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            channels: 1,
            buffer_duration_ms,
            block_len: self.window_step,
        }
    }
}

fn check_non_negative(name: &'static str, value: f32) -> ConfigResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = TunerConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.delta_freq(), 1.0);
        assert_eq!(config.spectrum_len(), 24_000);
    }

    #[test]
    fn capture_format_matches_block_length() {
        let format = TunerConfig::default().capture_format();
        assert_eq!(format.sample_rate, 48_000);
        assert_eq!(format.bits_per_sample, 16);
        assert_eq!(format.channels, 1);
        assert_eq!(format.buffer_duration_ms, 250);
        assert_eq!(format.block_len, 12_000);
    }

    #[test]
    fn rejects_other_sample_rates() {
        let config = TunerConfig {
            sample_rate: 44_100,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::UnsupportedSampleRate(44_100, 48_000))
        );
    }

    #[test]
    fn rejects_odd_window_and_unsorted_bands() {
        let odd = TunerConfig {
            window_size: 4_801,
            ..Default::default()
        };
        assert_eq!(odd.validate(), Err(ConfigError::InvalidWindowSize(4_801)));

        let bands = TunerConfig {
            octave_bands: vec![100.0, 50.0],
            ..Default::default()
        };
        assert!(matches!(
            bands.validate(),
            Err(ConfigError::InvalidOctaveBands(_))
        ));
    }

    #[test]
    fn rejects_bad_thresholds() {
        let config = TunerConfig {
            white_noise_threshold: f32::NAN,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                name: "white_noise_threshold",
                ..
            })
        ));
    }

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let config = TunerConfig::from_json(r#"{ "window_size": 4800, "concert_pitch": 442.0 }"#)
            .unwrap();
        assert_eq!(config.window_size, 4_800);
        assert_eq!(config.concert_pitch, 442.0);
        assert_eq!(config.num_harmonics, 5);
        assert_eq!(config.delta_freq(), 10.0);
    }

    #[test]
    fn json_is_validated() {
        assert!(TunerConfig::from_json(r#"{ "num_harmonics": 0 }"#).is_err());
        assert!(TunerConfig::from_json("not json").is_err());
    }
}

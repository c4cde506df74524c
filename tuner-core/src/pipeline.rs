//! # Analysis Pipeline
//!
//! One analysis cycle per captured block: ingest, window, spectrum, noise
//! suppression, HPS, note mapping and stability filtering, in that order.
//! The pipeline owns all mutable state of a cycle and is driven by exactly
//! one caller at a time.

use log::trace;

use crate::config::TunerConfig;
use crate::error::ConfigResult;
use crate::fft::SpectralAnalyzer;
use crate::stability::StabilityFilter;
use crate::window::SlidingWindow;
use crate::{ClosestNote, hps, ingest, noise, tuning};

/// Result of a single analysis cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The block was empty or malformed and never reached the window.
    Dropped,
    /// Signal power was below the threshold.
    Silent,
    /// Nothing survived noise suppression.
    NoPitch,
    /// A note was detected but has not been seen often enough yet.
    Unstable(ClosestNote),
    /// The same note was detected in enough consecutive cycles.
    Stable(ClosestNote),
}

impl CycleOutcome {
    /// The stable note, if this cycle produced one.
    pub fn stable_note(self) -> Option<ClosestNote> {
        match self {
            CycleOutcome::Stable(note) => Some(note),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct Pipeline {
    config: TunerConfig,
    window: SlidingWindow,
    analyzer: SpectralAnalyzer,
    stability: StabilityFilter,
}

impl Pipeline {
    pub fn new(config: TunerConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            window: SlidingWindow::new(config.window_size),
            analyzer: SpectralAnalyzer::new(config.window_size),
            stability: StabilityFilter::new(config.stability_depth),
            config,
        })
    }

    pub fn config(&self) -> &TunerConfig {
        &self.config
    }

    pub fn window(&self) -> &SlidingWindow {
        &self.window
    }

    /// Empties the sample window and the note history.
    pub fn reset(&mut self) {
        self.window.clear();
        self.stability.reset();
    }

    /// Runs a cycle on a little-endian 16-bit PCM byte block.
    pub fn process_bytes(&mut self, buffer: &[u8], bytes_recorded: usize) -> CycleOutcome {
        match ingest::normalize_bytes(buffer, bytes_recorded) {
            Some(samples) => self.process_samples(&samples),
            None => CycleOutcome::Dropped,
        }
    }

    /// Runs a cycle on a block of 16-bit samples.
    pub fn process_block(&mut self, block: &[i16]) -> CycleOutcome {
        self.process_samples(&ingest::normalize(block))
    }

    /// Runs a cycle on a block of normalized samples.
    pub fn process_samples(&mut self, samples: &[f32]) -> CycleOutcome {
        if samples.is_empty() {
            return CycleOutcome::Dropped;
        }
        self.window.push(samples);

        let power = self.window.signal_power();
        if power < self.config.power_threshold {
            trace!("Signal power {power:e} below threshold, skipping cycle");
            return CycleOutcome::Silent;
        }

        let Some(note) = self.detect() else {
            return CycleOutcome::NoPitch;
        };

        if self.stability.push(&note.note) {
            CycleOutcome::Stable(note)
        } else {
            trace!("Unstable detection {} at {} Hz", note.note, note.max_frequency);
            CycleOutcome::Unstable(note)
        }
    }

    /// Analyses the current window without touching the note history.
    pub fn detect(&mut self) -> Option<ClosestNote> {
        let delta_freq = self.config.delta_freq();
        let mut spectrum = self.analyzer.magnitude_spectrum(self.window.samples());

        noise::suppress_hum(&mut spectrum, delta_freq, self.config.hum_cutoff_hz);
        noise::gate_octave_bands(
            &mut spectrum,
            delta_freq,
            &self.config.octave_bands,
            self.config.white_noise_threshold,
        );

        let freq = hps::detect_fundamental(&spectrum, delta_freq, self.config.num_harmonics)?;
        tuning::closest_note(freq, self.config.concert_pitch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 0.1 s windows keep these tests fast; bins are 10 Hz wide.
    fn small_config() -> TunerConfig {
        TunerConfig {
            window_size: 4_800,
            window_step: 1_200,
            ..Default::default()
        }
    }

    fn tone(freq: f32, len: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| {
                let t = i as f32 / 48_000.0;
                (1..=5)
                    .map(|n| {
                        let n = n as f32;
                        amplitude / n * (2.0 * std::f32::consts::PI * freq * n * t).sin()
                    })
                    .sum()
            })
            .collect()
    }

    #[test]
    fn rejects_invalid_config() {
        let config = TunerConfig {
            num_harmonics: 0,
            ..Default::default()
        };
        assert!(Pipeline::new(config).is_err());
    }

    #[test]
    fn empty_and_malformed_blocks_are_dropped() {
        let mut pipeline = Pipeline::new(small_config()).unwrap();
        assert_eq!(pipeline.process_samples(&[]), CycleOutcome::Dropped);
        assert_eq!(pipeline.process_bytes(&[1, 2, 3], 3), CycleOutcome::Dropped);
        assert_eq!(pipeline.process_bytes(&[1, 2], 4), CycleOutcome::Dropped);
        assert!(pipeline.window().is_empty());
    }

    #[test]
    fn silence_never_detects() {
        let mut pipeline = Pipeline::new(small_config()).unwrap();
        for _ in 0..10 {
            assert_eq!(pipeline.process_block(&[0; 1_200]), CycleOutcome::Silent);
        }
        assert!(pipeline.window().is_primed());
    }

    #[test]
    fn steady_tone_becomes_stable() {
        let mut pipeline = Pipeline::new(small_config()).unwrap();
        let signal = tone(440.0, 4_800 * 2, 0.3);

        let outcomes: Vec<CycleOutcome> = signal
            .chunks(1_200)
            .map(|block| pipeline.process_samples(block))
            .collect();

        let last = outcomes.last().cloned().and_then(CycleOutcome::stable_note);
        let note = last.expect("tone should be stable by the second window");
        assert_eq!(note.note, "A4");
        assert_eq!(note.closest_pitch, 440.0);
        assert!((note.max_frequency - 440.0).abs() <= 2.0);
    }

    #[test]
    fn reset_starts_from_an_empty_window() {
        let mut pipeline = Pipeline::new(small_config()).unwrap();
        for block in tone(440.0, 4_800, 0.3).chunks(1_200) {
            pipeline.process_samples(block);
        }
        assert!(pipeline.window().is_primed());

        pipeline.reset();
        assert!(pipeline.window().is_empty());
        let outcome = pipeline.process_samples(&tone(440.0, 4_800, 0.3));
        assert!(matches!(outcome, CycleOutcome::Unstable(_)));
    }
}

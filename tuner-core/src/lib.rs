// tuner-core/src/lib.rs

//! The core logic for the guitar tuner.
//! This crate turns a live 16-bit mono audio stream into debounced note
//! events using a Harmonic Product Spectrum pitch detector. It is completely
//! headless and contains no GUI code.

pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod fft;
pub mod hps;
pub mod ingest;
pub mod noise;
pub mod pipeline;
pub mod stability;
pub mod tuning;
pub mod window;

use serde::{Deserialize, Serialize};

pub use audio::CpalCapture;
pub use config::{CaptureFormat, TunerConfig};
pub use engine::{BlockSink, CaptureSource, ChannelObserver, EngineState, NoteObserver, Tuner};
pub use error::ConfigError;
pub use tuning::{Tuning, find_tuning, tunings};

/// The note closest to the detected pitch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosestNote {
    /// Note name with octave, e.g. "A4" or "C#3".
    #[serde(rename = "noteName")]
    pub note: String,
    /// The detected fundamental frequency in Hz, rounded to 0.1 Hz.
    #[serde(rename = "detectedFrequencyHz")]
    pub max_frequency: f32,
    /// The equal-tempered frequency of `note` in Hz, rounded to 0.1 Hz.
    #[serde(rename = "referencePitchHz")]
    pub closest_pitch: f32,
}

impl ClosestNote {
    /// How far the detected frequency is from the reference pitch, in cents.
    pub fn cents_off(&self) -> f32 {
        tuning::calculate_cents_deviation(self.max_frequency, self.closest_pitch)
    }

    pub fn pitch_class(&self) -> Option<&str> {
        tuning::pitch_class(&self.note)
    }

    pub fn max_frequency_text(&self) -> String {
        if self.max_frequency > 0.0 {
            self.max_frequency.to_string()
        } else {
            String::new()
        }
    }

    pub fn closest_pitch_text(&self) -> String {
        if self.closest_pitch > 0.0 {
            self.closest_pitch.to_string()
        } else {
            String::new()
        }
    }

    /// "detected/reference Hz", e.g. "440.5/440 Hz".
    pub fn frequency_pitch_text(&self) -> String {
        if self.max_frequency + self.closest_pitch > 0.0 {
            format!("{}/{} Hz", self.max_frequency, self.closest_pitch)
        } else {
            String::new()
        }
    }
}

//! # Spectral Analysis Module
//!
//! Turns the current sample window into a magnitude spectrum. The Hann window
//! and the FFT plan are computed once at construction and reused for every
//! analysis cycle; only the scratch buffers are touched per cycle.
//!
//! ## Features
//! - High-performance FFT using RustFFT
//! - Hann windowing for reduced spectral leakage
//! - Zero padding of a window that is not yet full

use std::sync::Arc;

use rustfft::{Fft, FftPlanner, num_complex::Complex};

/// Computes a symmetric Hann window of length `n`.
pub fn hann_window(n: usize) -> Vec<f32> {
    if n <= 1 {
        return vec![1.0; n];
    }
    let n_minus_1 = (n - 1) as f32;
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / n_minus_1).cos()))
        .collect()
}

/// Forward FFT over a fixed window length, producing magnitudes.
pub struct SpectralAnalyzer {
    window_size: usize,
    hann: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl std::fmt::Debug for SpectralAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectralAnalyzer")
            .field("window_size", &self.window_size)
            .finish_non_exhaustive()
    }
}

impl SpectralAnalyzer {
    pub fn new(window_size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(window_size);
        let scratch = vec![Complex::default(); fft.get_inplace_scratch_len()];
        Self {
            window_size,
            hann: hann_window(window_size),
            fft,
            buffer: vec![Complex::default(); window_size],
            scratch,
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Returns the magnitudes of the first `window_size / 2` bins.
    ///
    /// `samples` may be shorter than the window, in which case it is aligned
    /// to the end of the window and preceded by zeros. Longer input keeps
    /// only its most recent `window_size` samples.
    pub fn magnitude_spectrum(&mut self, samples: &[f32]) -> Vec<f32> {
        let samples = &samples[samples.len().saturating_sub(self.window_size)..];
        let offset = self.window_size - samples.len();

        self.buffer[..offset].fill(Complex::default());
        for ((slot, &sample), &w) in self.buffer[offset..]
            .iter_mut()
            .zip(samples)
            .zip(&self.hann[offset..])
        {
            *slot = Complex {
                re: sample * w,
                im: 0.0,
            };
        }

        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        self.buffer
            .iter()
            .take(self.window_size / 2)
            .map(|c| c.norm()) // .norm() is sqrt(re^2 + im^2)
            .collect()
    }
}

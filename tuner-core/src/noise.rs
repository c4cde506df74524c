//! # Noise Suppression
//!
//! Two passes over a magnitude spectrum, applied in order:
//!
//! 1. Hum rejection zeroes every bin below a cutoff frequency.
//! 2. Octave band gating computes the RMS magnitude of each band and zeroes
//!    every bin that does not exceed a fixed fraction of it. Tonal peaks
//!    dominate their band and survive while the broadband floor is removed.

/// Zeroes all bins whose frequency lies below `cutoff_hz`.
pub fn suppress_hum(spectrum: &mut [f32], delta_freq: f32, cutoff_hz: f32) {
    let limit = ((cutoff_hz / delta_freq) as usize).min(spectrum.len());
    spectrum[..limit].fill(0.0);
}

/// Gates each octave band against its own RMS magnitude.
///
/// `bands` holds the band edges in Hz; band `j` covers
/// `[bands[j], bands[j + 1])`. Bands lying beyond the spectrum are skipped.
pub fn gate_octave_bands(spectrum: &mut [f32], delta_freq: f32, bands: &[f32], threshold: f32) {
    for edges in bands.windows(2) {
        let start = (edges[0] / delta_freq) as usize;
        let end = ((edges[1] / delta_freq) as usize).min(spectrum.len());
        if start >= end {
            continue;
        }

        let band = &mut spectrum[start..end];
        let rms = (band.iter().map(|&m| m * m).sum::<f32>() / band.len() as f32).sqrt();
        let floor = threshold * rms;
        for magnitude in band.iter_mut() {
            if *magnitude <= floor {
                *magnitude = 0.0;
            }
        }
    }
}

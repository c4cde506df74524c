//! # Harmonic Product Spectrum
//!
//! Locates the fundamental of a noise-suppressed magnitude spectrum:
//!
//! 1. Linearly upsample the spectrum by the number of harmonics.
//! 2. Normalize it to unit L2 norm.
//! 3. Multiply it by copies of itself decimated by 2, 3, ... so that a
//!    frequency is reinforced only when its harmonics carry energy too.
//! 4. Read the fundamental off the index of the largest product.

/// Linearly upsamples `spectrum` by `factor`.
///
/// Output index `i` samples the input at `i / factor`. Positions past the last
/// bin hold its value.
pub fn interpolate(spectrum: &[f32], factor: usize) -> Vec<f32> {
    let len = spectrum.len();
    let Some(&last) = spectrum.last() else {
        return Vec::new();
    };
    (0..len * factor)
        .map(|i| {
            let left = i / factor;
            let right = left + 1;
            if right >= len {
                return last;
            }
            let t = (i % factor) as f32 / factor as f32;
            spectrum[left] + (spectrum[right] - spectrum[left]) * t
        })
        .collect()
}

/// Scales `spectrum` to unit L2 norm.
///
/// Returns `false` and leaves the spectrum untouched when its norm is zero.
pub fn normalize(spectrum: &mut [f32]) -> bool {
    let norm = spectrum.iter().map(|&v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return false;
    }
    for value in spectrum.iter_mut() {
        *value /= norm;
    }
    true
}

/// Multiplies `spectrum` by its decimated copies for factors `2..=num_harmonics`.
///
/// Each stage keeps the first `ceil(len / h)` entries of the running product.
/// The loop stops at the first stage whose product is entirely zero and
/// returns the last non-zero product.
pub fn harmonic_product(spectrum: &[f32], num_harmonics: usize) -> Vec<f32> {
    let mut hps = spectrum.to_vec();

    for factor in 2..=num_harmonics {
        let hps_len = spectrum.len().div_ceil(factor).min(hps.len());
        let product: Vec<f32> = hps[..hps_len]
            .iter()
            .zip(spectrum.iter().step_by(factor))
            .map(|(&acc, &harmonic)| acc * harmonic)
            .collect();

        if product.iter().all(|&v| v == 0.0) {
            break;
        }
        hps = product;
    }
    hps
}

/// Index of the first maximum of `values`.
pub fn peak_index(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
            Some((_, max)) if v <= max => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

/// Detects the fundamental frequency of a noise-suppressed magnitude spectrum.
///
/// Returns the frequency in Hz, or `None` when the spectrum carries no energy.
pub fn detect_fundamental(spectrum: &[f32], delta_freq: f32, num_harmonics: usize) -> Option<f32> {
    let mut interpolated = interpolate(spectrum, num_harmonics);
    if !normalize(&mut interpolated) {
        return None;
    }

    let hps = harmonic_product(&interpolated, num_harmonics);
    let peak = peak_index(&hps)?;
    Some(peak as f32 * delta_freq / num_harmonics as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn harmonic_spectrum(len: usize, fundamental_bin: usize, partials: usize) -> Vec<f32> {
        let mut spectrum = vec![0.0; len];
        for n in 1..=partials {
            spectrum[fundamental_bin * n] = 1.0 / n as f32;
        }
        spectrum
    }

    #[test]
    fn interpolation_is_linear_and_clamped() {
        let ipol = interpolate(&[0.0, 1.0, 3.0], 2);
        assert_eq!(ipol, vec![0.0, 0.5, 1.0, 2.0, 3.0, 3.0]);
        assert!(interpolate(&[], 5).is_empty());
    }

    #[test]
    fn normalization_gives_unit_norm() {
        let mut values = vec![3.0, 4.0];
        assert!(normalize(&mut values));
        assert_abs_diff_eq!(values[0], 0.6);
        assert_abs_diff_eq!(values[1], 0.8);
    }

    #[test]
    fn zero_spectrum_cannot_be_normalized() {
        let mut values = vec![0.0; 8];
        assert!(!normalize(&mut values));
        assert!(values.iter().all(|&v| v == 0.0));
        assert_eq!(detect_fundamental(&vec![0.0; 100], 1.0, 5), None);
    }

    #[test]
    fn peak_lands_on_fundamental_not_harmonics() {
        let spectrum = harmonic_spectrum(1000, 50, 5);
        let mut interpolated = interpolate(&spectrum, 5);
        assert!(normalize(&mut interpolated));
        let hps = harmonic_product(&interpolated, 5);
        assert_eq!(peak_index(&hps), Some(250));
    }

    #[test]
    fn strongest_partial_does_not_win() {
        // The second partial is the loudest bin, as on many guitar strings.
        let mut spectrum = harmonic_spectrum(2000, 82, 5);
        spectrum[164] = 3.0;
        let freq = detect_fundamental(&spectrum, 1.0, 5).unwrap();
        assert_abs_diff_eq!(freq, 82.0);
    }

    #[test]
    fn product_stops_before_vanishing() {
        // A lone peak has no harmonic support; the first stage already
        // multiplies it by zero, so the interpolated spectrum is kept.
        let mut spectrum = vec![0.0; 100];
        spectrum[40] = 1.0;
        let hps = harmonic_product(&spectrum, 5);
        assert_eq!(hps, spectrum);
        assert_eq!(detect_fundamental(&spectrum, 2.0, 1), Some(80.0));
    }

    #[test]
    fn stage_lengths_shrink_by_factor() {
        let spectrum = vec![1.0; 10];
        assert_eq!(harmonic_product(&spectrum, 2).len(), 5);
        assert_eq!(harmonic_product(&spectrum, 3).len(), 4);
        assert_eq!(harmonic_product(&spectrum, 1).len(), 10);
    }

    #[test]
    fn first_maximum_wins_ties() {
        assert_eq!(peak_index(&[0.0, 2.0, 1.0, 2.0]), Some(1));
        assert_eq!(peak_index(&[]), None);
    }
}

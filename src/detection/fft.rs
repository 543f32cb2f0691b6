//! FFT utilities for spectral analysis.
//!
//! Thin wrappers over `rustfft` for full complex transforms, periodograms,
//! and frequency-domain low-pass filtering.

use rustfft::{num_complex::Complex64, FftPlanner};

/// Forward FFT of a complex buffer.
pub fn fft(signal: &[Complex64]) -> Vec<Complex64> {
    let mut buffer = signal.to_vec();
    if buffer.is_empty() {
        return buffer;
    }
    let mut planner = FftPlanner::new();
    planner.plan_fft_forward(buffer.len()).process(&mut buffer);
    buffer
}

/// Inverse FFT, normalised by the buffer length.
pub fn ifft(spectrum: &[Complex64]) -> Vec<Complex64> {
    let mut buffer = spectrum.to_vec();
    let n = buffer.len();
    if n == 0 {
        return buffer;
    }
    let mut planner = FftPlanner::new();
    planner.plan_fft_inverse(n).process(&mut buffer);
    let scale = 1.0 / n as f64;
    for c in buffer.iter_mut() {
        *c *= scale;
    }
    buffer
}

/// Compute the FFT of a real-valued signal.
///
/// Only returns the first half (positive frequencies) since
/// the input is real-valued and the spectrum is symmetric.
///
/// # Returns
/// Complex frequency components for frequencies 0 to N/2
pub fn fft_real(signal: &[f64]) -> Vec<Complex64> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }
    let buffer: Vec<Complex64> = signal.iter().map(|&x| Complex64::new(x, 0.0)).collect();
    let mut spectrum = fft(&buffer);
    spectrum.truncate(n / 2 + 1);
    spectrum
}

/// Compute the periodogram (power spectral density) of a signal.
///
/// Returns (period, power) pairs sorted by period (largest first), where power
/// is the squared magnitude of the FFT normalized by the signal length.
pub fn periodogram(signal: &[f64]) -> Vec<(usize, f64)> {
    let n = signal.len();
    if n < 4 {
        return Vec::new();
    }

    let fft_result = fft_real(signal);
    let n_f64 = n as f64;
    let mut result = Vec::with_capacity(n / 2);

    for (k, complex) in fft_result.iter().enumerate().skip(1) {
        let period = n / k;
        if period < 2 {
            break;
        }
        let power = complex.norm_sqr() / n_f64;
        result.push((period, power));
    }

    result.sort_by(|a, b| b.0.cmp(&a.0));
    result
}

/// Periodogram peaks above `threshold` times the median power.
///
/// # Returns
/// (period, power) tuples sorted by power (highest first)
pub fn periodogram_peaks(
    signal: &[f64],
    threshold: f64,
    min_period: usize,
    max_period: usize,
) -> Vec<(usize, f64)> {
    let filtered: Vec<(usize, f64)> = periodogram(signal)
        .into_iter()
        .filter(|(p, _)| *p >= min_period && *p <= max_period)
        .collect();
    if filtered.is_empty() {
        return Vec::new();
    }

    let mut powers: Vec<f64> = filtered.iter().map(|(_, p)| *p).collect();
    powers.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let noise_floor = if powers.len() % 2 == 0 {
        (powers[powers.len() / 2 - 1] + powers[powers.len() / 2]) / 2.0
    } else {
        powers[powers.len() / 2]
    };

    let peak_threshold = noise_floor * threshold;
    let mut peaks: Vec<(usize, f64)> = filtered
        .into_iter()
        .filter(|(_, power)| *power > peak_threshold)
        .collect();
    peaks.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    peaks
}

/// Keep the lowest `keep_fraction` of frequencies and transform back.
///
/// At least the DC component and the first harmonic survive.
pub fn low_pass(signal: &[f64], keep_fraction: f64) -> Vec<f64> {
    let n = signal.len();
    if n < 3 {
        return signal.to_vec();
    }
    let cutoff = ((keep_fraction.clamp(0.0, 1.0) * (n / 2) as f64).round() as usize).max(1);
    let buffer: Vec<Complex64> = signal.iter().map(|&x| Complex64::new(x, 0.0)).collect();
    let mut spectrum = fft(&buffer);
    for (k, c) in spectrum.iter_mut().enumerate() {
        if k.min(n - k) > cutoff {
            *c = Complex64::new(0.0, 0.0);
        }
    }
    ifft(&spectrum).into_iter().map(|c| c.re).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn generate_sine(n: usize, period: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * i as f64 / period as f64).sin())
            .collect()
    }

    #[test]
    fn fft_real_pure_sine() {
        let signal = generate_sine(128, 16);
        let fft_result = fft_real(&signal);
        assert_eq!(fft_result.len(), 65);

        let max_idx = fft_result
            .iter()
            .enumerate()
            .skip(1)
            .max_by(|(_, a), (_, b)| a.norm_sqr().partial_cmp(&b.norm_sqr()).unwrap())
            .map(|(i, _)| i)
            .unwrap();

        assert_eq!(max_idx, 8); // frequency index 8 = period 16
    }

    #[test]
    fn fft_real_empty() {
        assert!(fft_real(&[]).is_empty());
        assert!(ifft(&[]).is_empty());
    }

    #[test]
    fn inverse_undoes_forward() {
        let signal: Vec<Complex64> = (0..13)
            .map(|i| Complex64::new((i * i % 7) as f64, 0.0))
            .collect();
        let back = ifft(&fft(&signal));
        for (a, b) in signal.iter().zip(&back) {
            assert_relative_eq!(a.re, b.re, epsilon = 1e-10);
            assert_relative_eq!(b.im, 0.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn periodogram_pure_sine() {
        let signal = generate_sine(128, 12);
        let psd = periodogram(&signal);
        let (period, _) = psd
            .iter()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
            .unwrap();
        assert!((10..=14).contains(period), "Expected period near 12, got {}", period);
    }

    #[test]
    fn periodogram_peaks_threshold() {
        let signal = generate_sine(128, 16);
        let peaks = periodogram_peaks(&signal, 3.0, 2, 64);
        assert!(!peaks.is_empty());
        let (period, _) = peaks[0];
        assert!((14..=18).contains(&period), "Expected period near 16, got {}", period);
    }

    #[test]
    fn periodogram_high_threshold_reduces_peaks() {
        let signal: Vec<f64> = (0..128).map(|i| ((i * 7 + 3) % 13) as f64 - 6.0).collect();
        let peaks_low = periodogram_peaks(&signal, 1.5, 2, 64);
        let peaks_high = periodogram_peaks(&signal, 10.0, 2, 64);
        assert!(peaks_high.len() <= peaks_low.len());
    }

    #[test]
    fn low_pass_removes_high_frequency() {
        let n = 64;
        let slow = generate_sine(n, 32);
        let fast = generate_sine(n, 4);
        let mixed: Vec<f64> = slow.iter().zip(&fast).map(|(a, b)| a + b).collect();
        let filtered = low_pass(&mixed, 0.25);
        for (f, s) in filtered.iter().zip(&slow) {
            assert_relative_eq!(*f, *s, epsilon = 1e-9);
        }
    }

    #[test]
    fn low_pass_keeps_constant() {
        let filtered = low_pass(&[3.0; 20], 0.0);
        for v in filtered {
            assert_relative_eq!(v, 3.0, epsilon = 1e-12);
        }
    }
}

//! Spectral residual saliency.
//!
//! Ren et al., "Time-Series Anomaly Detection Service at Microsoft"
//! (KDD 2019). The log-amplitude spectrum is compared with its local
//! average; what remains after subtracting the average is the "novel" part
//! of the spectrum, and transforming it back with the original phases
//! highlights the points responsible for it.

use super::fft::{fft, ifft};
use rustfft::num_complex::Complex64;

/// Points appended past the end of the batch before transforming.
pub const BACK_ADD_WINDOW: usize = 5;
/// Trailing points used to extrapolate the appended values.
pub const LOOKAHEAD_WINDOW: usize = 5;
/// Window of the log-amplitude smoothing.
pub const AVERAGING_WINDOW: usize = 3;
/// Window of the saliency baseline.
pub const JUDGEMENT_WINDOW: usize = 40;
/// Raw scores are `min(relative excess, MAX_RATIO) / MAX_RATIO`.
const MAX_RATIO: f64 = 10.0;
const MAG_EPSILON: f64 = 1e-8;

/// Saliency and raw score for each point of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct SaliencyMap {
    /// Saliency magnitude per point.
    pub magnitude: Vec<f64>,
    /// Normalised excess over the trailing saliency average, in [0, 1].
    pub raw_score: Vec<f64>,
}

impl SaliencyMap {
    pub fn len(&self) -> usize {
        self.magnitude.len()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitude.is_empty()
    }
}

/// Run the spectral residual transform over one batch.
pub fn saliency_map(values: &[f64]) -> SaliencyMap {
    let n = values.len();
    if n == 0 {
        return SaliencyMap {
            magnitude: Vec::new(),
            raw_score: Vec::new(),
        };
    }

    let extended = back_extend(values);
    let mut magnitude = saliency(&extended);
    magnitude.truncate(n);

    let baseline = trailing_average(&magnitude, JUDGEMENT_WINDOW);
    let raw_score = magnitude
        .iter()
        .zip(&baseline)
        .map(|(&s, &avg)| {
            if avg <= MAG_EPSILON {
                return 0.0;
            }
            ((s - avg) / avg).clamp(0.0, MAX_RATIO) / MAX_RATIO
        })
        .collect();

    SaliencyMap {
        magnitude,
        raw_score,
    }
}

/// Append [`BACK_ADD_WINDOW`] copies of an extrapolated next value.
///
/// The extrapolation averages the slopes from each of the last
/// `LOOKAHEAD_WINDOW` points to the final point.
pub fn back_extend(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut extended = values.to_vec();
    let next = if n < 2 {
        values.first().copied().unwrap_or(0.0)
    } else {
        let tail = &values[n.saturating_sub(LOOKAHEAD_WINDOW + 1)..];
        let m = tail.len();
        let last = tail[m - 1];
        let slope_sum: f64 = tail[..m - 1]
            .iter()
            .enumerate()
            .map(|(i, v)| (last - v) / (m - 1 - i) as f64)
            .sum();
        tail[1.min(m - 1)] + slope_sum
    };
    extended.extend(std::iter::repeat(next).take(BACK_ADD_WINDOW));
    extended
}

/// Saliency magnitude of every point of `values`.
pub fn saliency(values: &[f64]) -> Vec<f64> {
    let buffer: Vec<Complex64> = values.iter().map(|&v| Complex64::new(v, 0.0)).collect();
    let spectrum = fft(&buffer);

    let log_magnitude: Vec<f64> = spectrum
        .iter()
        .map(|c| {
            let mag = c.norm();
            if mag > MAG_EPSILON {
                mag.ln()
            } else {
                0.0
            }
        })
        .collect();
    let smoothed = trailing_average(&log_magnitude, AVERAGING_WINDOW);

    let residual_spectrum: Vec<Complex64> = spectrum
        .iter()
        .zip(log_magnitude.iter().zip(&smoothed))
        .map(|(c, (lm, avg))| {
            let mag = c.norm();
            if mag > MAG_EPSILON {
                *c * ((lm - avg).exp() / mag)
            } else {
                Complex64::new(0.0, 0.0)
            }
        })
        .collect();

    ifft(&residual_spectrum).iter().map(|c| c.norm()).collect()
}

/// Average over the last `window` points up to and including each index.
pub fn trailing_average(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut running = 0.0;
    for (i, v) in values.iter().enumerate() {
        running += v;
        if i >= window {
            running -= values[i - window];
        }
        out.push(running / (i + 1).min(window) as f64);
    }
    out
}

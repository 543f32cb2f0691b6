//! Linear recurrence formula (LRF) derived from an SSA signal subspace.

use rustfft::num_complex::Complex64;

/// Roots above this modulus are treated as explosive.
const UNIT_CIRCLE_TOLERANCE: f64 = 1e-6;
/// Verticality threshold: `ν²` values closer to 1 than this are rejected.
const VERTICALITY_EPS: f64 = 1e-9;
const ROOT_MAX_ITERATIONS: usize = 500;
const ROOT_TOLERANCE: f64 = 1e-12;

/// `x_t = Σ coefficients[i] · x_{t-m+i}` with `m = coefficients.len()`.
///
/// Coefficients are stored oldest lag first, so a history slice of the last
/// `m` values (in time order) can be dotted directly.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearRecurrence {
    coefficients: Vec<f64>,
}

impl LinearRecurrence {
    pub fn new(coefficients: Vec<f64>) -> Self {
        Self { coefficients }
    }

    /// Recurrence that repeats the previous value.
    pub fn persistence(order: usize) -> Self {
        let mut coefficients = vec![0.0; order];
        if let Some(last) = coefficients.last_mut() {
            *last = 1.0;
        }
        Self { coefficients }
    }

    /// Build the LRF from the leading `rank` eigenvectors of a lag-covariance
    /// matrix (`basis[i][j]` is component `i` of eigenvector `j`).
    ///
    /// Returns `None` when the subspace is vertical (`ν² ≈ 1`), in which case no
    /// recurrence exists.
    pub fn from_basis(basis: &[Vec<f64>], rank: usize) -> Option<Self> {
        let window = basis.len();
        if window < 2 || rank == 0 {
            return None;
        }
        let last = &basis[window - 1];
        let nu2: f64 = last.iter().take(rank).map(|p| p * p).sum();
        if nu2 >= 1.0 - VERTICALITY_EPS {
            return None;
        }

        let scale = 1.0 / (1.0 - nu2);
        let coefficients = basis[..window - 1]
            .iter()
            .map(|row| {
                scale
                    * row
                        .iter()
                        .zip(last.iter())
                        .take(rank)
                        .map(|(u, pi)| u * pi)
                        .sum::<f64>()
            })
            .collect();
        Some(Self { coefficients })
    }

    /// Number of past values the recurrence consumes.
    pub fn order(&self) -> usize {
        self.coefficients.len()
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Predict the next value from the last `order()` values (oldest first).
    pub fn predict(&self, history: &[f64]) -> f64 {
        debug_assert_eq!(history.len(), self.coefficients.len());
        self.coefficients
            .iter()
            .zip(history)
            .map(|(a, x)| a * x)
            .sum()
    }

    /// Coefficient of lag `k` (1-based): `x_t = Σ_k a_k x_{t-k}`.
    fn lag(&self, k: usize) -> f64 {
        self.coefficients[self.coefficients.len() - k]
    }

    /// Run the recurrence `horizon` steps past `history`.
    pub fn extend(&self, history: &[f64], horizon: usize) -> Vec<f64> {
        let m = self.order();
        let mut buffer: Vec<f64> = history[history.len().saturating_sub(m)..].to_vec();
        let mut out = Vec::with_capacity(horizon);
        for _ in 0..horizon {
            let next = self.predict(&buffer[buffer.len() - m..]);
            out.push(next);
            buffer.push(next);
        }
        out
    }

    /// Impulse response `ψ_0..ψ_{len-1}` with `ψ_0 = 1`.
    pub fn impulse_response(&self, len: usize) -> Vec<f64> {
        let m = self.order();
        let mut psi = Vec::with_capacity(len);
        for k in 0..len {
            if k == 0 {
                psi.push(1.0);
                continue;
            }
            let value = (1..=k.min(m)).map(|i| self.lag(i) * psi[k - i]).sum();
            psi.push(value);
        }
        psi
    }

    /// Roots of the characteristic polynomial `z^m - a_1 z^{m-1} - ... - a_m`.
    ///
    /// `None` if the root finder does not converge.
    pub fn characteristic_roots(&self) -> Option<Vec<Complex64>> {
        let m = self.order();
        let mut monic = Vec::with_capacity(m + 1);
        monic.push(1.0);
        monic.extend((1..=m).map(|k| -self.lag(k)));
        durand_kerner(&monic)
    }

    /// Pull explosive characteristic roots back onto the unit circle.
    ///
    /// Returns `true` if the coefficients were modified. The recurrence is left
    /// unchanged when the root finder does not converge.
    pub fn stabilize(&mut self) -> bool {
        let Some(mut roots) = self.characteristic_roots() else {
            log::debug!("LRF root finder did not converge; skipping stabilisation");
            return false;
        };

        let mut changed = false;
        for root in roots.iter_mut() {
            let modulus = root.norm();
            if modulus > 1.0 + UNIT_CIRCLE_TOLERANCE {
                *root /= modulus;
                changed = true;
            }
        }
        if !changed {
            return false;
        }

        let poly = poly_from_roots(&roots);
        let m = self.order();
        for k in 1..=m {
            self.coefficients[m - k] = -poly[k].re;
        }
        true
    }
}

/// Simultaneous root iteration for a monic polynomial (`coeffs[0] == 1`).
fn durand_kerner(coeffs: &[f64]) -> Option<Vec<Complex64>> {
    let degree = coeffs.len().saturating_sub(1);
    if degree == 0 {
        return Some(Vec::new());
    }

    let radius = 1.0 + coeffs[1..].iter().fold(0.0_f64, |acc, c| acc.max(c.abs()));
    let seed = Complex64::new(0.4, 0.9);
    let mut roots: Vec<Complex64> = (0..degree)
        .map(|k| seed.powu(k as u32) * radius / seed.norm().powi(k as i32).max(1e-12))
        .collect();

    let eval = |z: Complex64| {
        coeffs
            .iter()
            .fold(Complex64::new(0.0, 0.0), |acc, &c| acc * z + c)
    };

    for _ in 0..ROOT_MAX_ITERATIONS {
        let mut max_step: f64 = 0.0;
        for i in 0..degree {
            let zi = roots[i];
            let mut denom = Complex64::new(1.0, 0.0);
            for (j, &zj) in roots.iter().enumerate() {
                if j != i {
                    denom *= zi - zj;
                }
            }
            if denom.norm() == 0.0 {
                denom = Complex64::new(ROOT_TOLERANCE, 0.0);
            }
            let step = eval(zi) / denom;
            roots[i] = zi - step;
            max_step = max_step.max(step.norm() / (1.0 + zi.norm()));
        }
        if !max_step.is_finite() {
            return None;
        }
        if max_step < ROOT_TOLERANCE {
            return Some(roots);
        }
    }
    None
}

/// Monic polynomial coefficients (highest degree first) from its roots.
fn poly_from_roots(roots: &[Complex64]) -> Vec<Complex64> {
    let mut poly = vec![Complex64::new(1.0, 0.0)];
    for &root in roots {
        let mut next = vec![Complex64::new(0.0, 0.0); poly.len() + 1];
        for (k, &c) in poly.iter().enumerate() {
            next[k] += c;
            next[k + 1] -= root * c;
        }
        poly = next;
    }
    poly
}

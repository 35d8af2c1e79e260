//! Starting poles
//!
//! All poles are produced in normalized angular frequency (rad/s divided by
//! the frequency scale), complex poles as the positive member of each pair.

use ndarray::Array2;
use num_complex::Complex64;

use super::constants::{
    COMPLEX_POLE_DAMPING_RATIO, COMPLEX_POLE_START_FRACTION, PHASE_TRANSITION_DEG,
    REAL_POLE_DIVISOR, REAL_POLE_START_FRACTION,
};
use super::poles::PoleSet;

/// Initial pole spacing type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InitPoleSpacing {
    #[default]
    Linear,
    Logarithmic,
}

/// Poles spread over the frequency band
///
/// Real poles: `-spaced(w_max / 75, w_max, n_real) / 50`.
/// Complex poles: `w * (-0.01 + j)` for `w` in `spaced(w_max / 100, w_max, n_complex)`.
pub fn default_poles(
    omega_max: f64,
    n_real: usize,
    n_complex: usize,
    spacing: InitPoleSpacing,
) -> PoleSet {
    let spaced = |start: f64, n: usize| match spacing {
        InitPoleSpacing::Linear => linspace(start, omega_max, n),
        InitPoleSpacing::Logarithmic => logspace(start, omega_max, n),
    };

    let real = spaced(omega_max * REAL_POLE_START_FRACTION, n_real)
        .into_iter()
        .map(|w| -w / REAL_POLE_DIVISOR)
        .collect();
    let complex = spaced(omega_max * COMPLEX_POLE_START_FRACTION, n_complex)
        .into_iter()
        .map(resonance_pole)
        .collect();

    PoleSet::from_parts(real, complex)
}

/// Poles placed from features of the data
///
/// One lightly damped pair at every sample that is a strict local maximum of
/// `|D|` in any channel. The number of real poles follows the total phase
/// excursion (one per 90 degrees, minus the pairs already placed, at least
/// one).
///
/// # Arguments
/// * `channels` - Response per channel [n_channels, nfreq]
/// * `omega` - Normalized angular frequencies
pub fn smart_poles(channels: &Array2<Complex64>, omega: &[f64]) -> PoleSet {
    let omega_max = omega.iter().copied().fold(0.0, f64::max);

    let mut maxima: Vec<usize> = channels
        .outer_iter()
        .flat_map(|ch| {
            let mag: Vec<f64> = ch.iter().map(|v| v.norm()).collect();
            local_maxima(&mag)
        })
        .collect();
    maxima.sort_unstable();
    maxima.dedup();

    let complex: Vec<Complex64> = maxima.iter().map(|&i| resonance_pole(omega[i])).collect();

    let max_excursion = channels
        .outer_iter()
        .map(|ch| {
            let phase = unwrap_degrees(ch.iter().map(|v| v.arg().to_degrees()));
            let first = phase.first().copied().unwrap_or(0.0);
            phase
                .iter()
                .map(|p| (p - first).abs())
                .fold(0.0, f64::max)
        })
        .fold(0.0, f64::max);
    let transitions = (max_excursion / PHASE_TRANSITION_DEG).floor() as usize;
    let n_real = transitions.saturating_sub(complex.len()).max(1);

    let real = linspace(1.0, omega_max, n_real)
        .into_iter()
        .map(|w| -w / REAL_POLE_DIVISOR)
        .collect();

    PoleSet::from_parts(real, complex)
}

#[inline]
fn resonance_pole(w: f64) -> Complex64 {
    Complex64::new(-COMPLEX_POLE_DAMPING_RATIO * w, w)
}

/// Indices `i` with `x[i-1] < x[i] >= x[i+1]`
///
/// A flat top sampled as equal neighbours is reported once, at its first
/// sample.
fn local_maxima(x: &[f64]) -> Vec<usize> {
    x.windows(3)
        .enumerate()
        .filter(|(_, w)| w[1] > w[0] && w[1] >= w[2])
        .map(|(i, _)| i + 1)
        .collect()
}

/// Remove 360 degree jumps between consecutive samples
fn unwrap_degrees(phase: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut out: Vec<f64> = Vec::new();
    let mut offset = 0.0;
    let mut prev: Option<f64> = None;

    for p in phase {
        if let Some(q) = prev {
            let jump = p - q;
            if jump > 180.0 {
                offset -= 360.0 * ((jump + 180.0) / 360.0).floor();
            } else if jump < -180.0 {
                offset += 360.0 * ((-jump + 180.0) / 360.0).floor();
            }
        }
        out.push(p + offset);
        prev = Some(p);
    }

    out
}

/// `n` evenly spaced values from `start` to `end`; `[start]` when `n == 1`
pub(crate) fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![start],
        _ => (0..n)
            .map(|i| start + (end - start) * i as f64 / (n - 1) as f64)
            .collect(),
    }
}

/// `n` logarithmically spaced values from `start` to `end`
pub(crate) fn logspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    if start <= 0.0 || end <= 0.0 {
        return linspace(start, end, n);
    }
    linspace(start.ln(), end.ln(), n)
        .into_iter()
        .map(f64::exp)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_default_poles_linear() {
        let w_max = 2.0 * PI;
        let poles = default_poles(w_max, 2, 3, InitPoleSpacing::Linear);

        assert_eq!(poles.n_real(), 2);
        assert_eq!(poles.n_complex(), 3);
        assert_relative_eq!(poles.real_poles()[0], -w_max / 75.0 / 50.0);
        assert_relative_eq!(poles.real_poles()[1], -w_max / 50.0);

        let first = poles.complex_poles()[0];
        assert_relative_eq!(first.im, w_max / 100.0);
        assert_relative_eq!(first.re, -0.01 * first.im);
        assert!(poles.complex_poles().iter().all(|p| p.im > 0.0 && p.re < 0.0));
    }

    #[test]
    fn test_default_poles_logarithmic() {
        let poles = default_poles(100.0, 0, 3, InitPoleSpacing::Logarithmic);
        let ims: Vec<f64> = poles.complex_poles().iter().map(|p| p.im).collect();
        assert_relative_eq!(ims[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(ims[1], 10.0, epsilon = 1e-12);
        assert_relative_eq!(ims[2], 100.0, epsilon = 1e-12);
    }

    #[test]
    fn test_linspace_single_point_is_start() {
        assert_eq!(linspace(3.0, 10.0, 1), vec![3.0]);
        let v = linspace(0.0, 10.0, 5);
        assert_relative_eq!(v[2], 5.0);
        assert_relative_eq!(v[4], 10.0);
    }

    #[test]
    fn test_local_maxima_and_unwrap() {
        assert_eq!(local_maxima(&[0.0, 1.0, 0.5, 0.7, 0.2, 0.2]), vec![1, 3]);
        // Peak split over two equal samples, rising edge only
        assert_eq!(local_maxima(&[0.1, 0.4, 0.9, 0.9, 0.3]), vec![2]);

        let unwrapped = unwrap_degrees([170.0, -170.0, -150.0].into_iter());
        assert_relative_eq!(unwrapped[1], 190.0);
        assert_relative_eq!(unwrapped[2], 210.0);
    }

    #[test]
    fn test_smart_poles_find_resonance() {
        // Single resonance near w = 1
        let omega: Vec<f64> = (1..=200).map(|i| i as f64 * 0.01).collect();
        let p = Complex64::new(-0.02, 1.0);
        let channels = Array2::from_shape_fn((1, omega.len()), |(_, f)| {
            let s = Complex64::new(0.0, omega[f]);
            1.0 / (s - p) + 1.0 / (s - p.conj())
        });

        let poles = smart_poles(&channels, &omega);
        assert_eq!(poles.n_complex(), 1);
        assert_relative_eq!(poles.complex_poles()[0].im, 1.0, epsilon = 0.011);
        assert!(poles.n_real() >= 1);
    }
}

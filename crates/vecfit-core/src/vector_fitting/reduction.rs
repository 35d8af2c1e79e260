//! Automatic order reduction
//!
//! A pole record is dropped when the fitted response without it still matches
//! the data to within the tolerance (mean relative error). The scan restarts
//! after every removal since the remaining records then see a different
//! reference fit.

use ndarray::Array3;
use num_complex::Complex64;
use std::f64::consts::PI;
use tracing::debug;

use super::model::relative_error;
use super::poles::{HalfModel, PoleRecord};
use crate::response::SampledResponse;

/// Remove pole records that do not contribute to the fit
///
/// Real records are tried before complex records. At least one record is
/// always kept. Returns the removed poles in normalized units.
pub fn reduce_order(
    half: &mut HalfModel,
    response: &SampledResponse,
    freq_scale: f64,
    tol: f64,
) -> Vec<Complex64> {
    let shape = (response.n_outputs(), response.n_inputs());
    let omega: Vec<f64> = response
        .freqs()
        .iter()
        .map(|f| 2.0 * PI * f / freq_scale)
        .collect();
    let mut removed = Vec::new();

    while half.n_records() > 1 {
        let fit = half.expand(freq_scale, shape).evaluate(response.freqs());

        let candidate = half
            .real
            .iter()
            .map(|rec| (rec, false))
            .chain(half.complex.iter().map(|rec| (rec, true)))
            .find(|(rec, paired)| {
                let reduced = without_record(&fit, rec, *paired, &omega);
                let (_, err_mean) = relative_error(response.data(), &reduced);
                err_mean < tol
            })
            .map(|(rec, _)| (rec.id(), rec.pole));

        match candidate {
            Some((id, pole)) => {
                half.remove(id);
                debug!(pole = %pole, remaining = half.n_records(), "discarded pole");
                removed.push(pole);
            }
            None => break,
        }
    }

    removed
}

/// Fitted response with the contribution of one record subtracted
fn without_record(
    fit: &Array3<Complex64>,
    rec: &PoleRecord,
    paired: bool,
    omega: &[f64],
) -> Array3<Complex64> {
    let mut reduced = fit.clone();
    let conj_residue = rec.residue.mapv(|r| r.conj());

    for (mut h, &w) in reduced.outer_iter_mut().zip(omega) {
        let s = Complex64::new(0.0, w);
        h.scaled_add(-(1.0 / (s - rec.pole)), &rec.residue);
        if paired {
            h.scaled_add(-(1.0 / (s - rec.pole.conj())), &conj_residue);
        }
    }

    reduced
}

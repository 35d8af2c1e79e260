//! Partial-fraction basis shared by all residue solvers
//!
//! Column order of `X_F`:
//! `[const?, jw?, 1/(jw)?, real poles..., complex re-columns..., complex im-columns...]`
//!
//! `X_S` is `X_F` without the polynomial columns.

use ndarray::{s, Array2, ArrayView2};
use num_complex::Complex64;

use super::poles::PoleSet;

/// Which polynomial terms are fitted next to the pole terms
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PolynomialTerms {
    pub constant: bool,
    pub proportional: bool,
    pub pole_at_origin: bool,
}

impl PolynomialTerms {
    /// Number of enabled terms
    pub fn count(&self) -> usize {
        [self.constant, self.proportional, self.pole_at_origin]
            .iter()
            .filter(|&&on| on)
            .count()
    }
}

/// Column counts of a basis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasisLayout {
    pub terms: PolynomialTerms,
    pub n_real: usize,
    pub n_complex: usize,
}

impl BasisLayout {
    /// Number of polynomial columns
    #[inline]
    pub fn n_poly(&self) -> usize {
        self.terms.count()
    }

    /// Columns of `X_S` (one per real pole, two per complex pair)
    #[inline]
    pub fn n_sigma(&self) -> usize {
        self.n_real + 2 * self.n_complex
    }

    /// Columns of `X_F`
    #[inline]
    pub fn n_f(&self) -> usize {
        self.n_poly() + self.n_sigma()
    }
}

/// Partial-fraction matrices evaluated on the normalized grid
#[derive(Debug, Clone)]
pub struct Basis {
    x_f: Array2<Complex64>,
    layout: BasisLayout,
}

impl Basis {
    /// `X_F` [nfreq, n_f]
    pub fn x_f(&self) -> ArrayView2<'_, Complex64> {
        self.x_f.view()
    }

    /// `X_S` [nfreq, n_sigma], a view into the pole columns of `X_F`
    pub fn x_s(&self) -> ArrayView2<'_, Complex64> {
        self.x_f.slice(s![.., self.layout.n_poly()..])
    }

    pub fn layout(&self) -> BasisLayout {
        self.layout
    }

    /// Number of frequency samples
    pub fn nfreq(&self) -> usize {
        self.x_f.nrows()
    }
}

/// Build the basis for a pole set on the normalized angular frequencies `omega`
pub fn build_basis(poles: &PoleSet, omega: &[f64], terms: PolynomialTerms) -> Basis {
    let layout = BasisLayout {
        terms,
        n_real: poles.n_real(),
        n_complex: poles.n_complex(),
    };
    let n_real = layout.n_real;
    let n_cpx = layout.n_complex;

    let one = Complex64::new(1.0, 0.0);
    let j = Complex64::i();
    let mut x_f = Array2::<Complex64>::zeros((omega.len(), layout.n_f()));

    for (f_idx, &w) in omega.iter().enumerate() {
        let s = Complex64::new(0.0, w);
        let mut row = x_f.row_mut(f_idx);

        let mut col = 0;
        if terms.constant {
            row[col] = one;
            col += 1;
        }
        if terms.proportional {
            row[col] = s;
            col += 1;
        }
        if terms.pole_at_origin {
            row[col] = one / s;
            col += 1;
        }

        for (i, &p) in poles.real_poles().iter().enumerate() {
            row[col + i] = one / (s - p);
        }
        col += n_real;

        for (i, &p) in poles.complex_poles().iter().enumerate() {
            let t1 = one / (s - p);
            let t2 = one / (s - p.conj());
            row[col + i] = t1 + t2;
            row[col + n_cpx + i] = j * (t1 - t2);
        }
    }

    Basis { x_f, layout }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_layout_counts() {
        let poles = PoleSet::from_parts(vec![-1.0], vec![Complex64::new(-0.1, 1.0); 2]);
        let terms = PolynomialTerms {
            constant: true,
            proportional: true,
            pole_at_origin: false,
        };
        let basis = build_basis(&poles, &[0.5, 1.0, 2.0], terms);

        let layout = basis.layout();
        assert_eq!(layout.n_poly(), 2);
        assert_eq!(layout.n_sigma(), 5);
        assert_eq!(basis.x_f().dim(), (3, 7));
        assert_eq!(basis.x_s().dim(), (3, 5));
    }

    #[test]
    fn test_complex_columns_reproduce_pair() {
        // r/(s-p) + conj(r)/(s-conj(p)) = Re r * col_re + Im r * col_im
        let p = Complex64::new(-0.2, 1.5);
        let r = Complex64::new(0.7, -0.3);
        let poles = PoleSet::from_parts(vec![], vec![p]);
        let omega = [0.3, 1.5, 4.0];
        let basis = build_basis(&poles, &omega, PolynomialTerms::default());

        for (f_idx, &w) in omega.iter().enumerate() {
            let s = Complex64::new(0.0, w);
            let expected = r / (s - p) + r.conj() / (s - p.conj());
            let got = basis.x_s()[[f_idx, 0]] * r.re + basis.x_s()[[f_idx, 1]] * r.im;
            assert_relative_eq!(got.re, expected.re, epsilon = 1e-12);
            assert_relative_eq!(got.im, expected.im, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_polynomial_columns() {
        let terms = PolynomialTerms {
            constant: true,
            proportional: true,
            pole_at_origin: true,
        };
        let basis = build_basis(&PoleSet::default(), &[2.0], terms);
        let row = basis.x_f().row(0).to_vec();

        assert_eq!(row[0], Complex64::new(1.0, 0.0));
        assert_eq!(row[1], Complex64::new(0.0, 2.0));
        assert_relative_eq!(row[2].im, -0.5);
        assert_eq!(basis.x_s().ncols(), 0);
    }
}

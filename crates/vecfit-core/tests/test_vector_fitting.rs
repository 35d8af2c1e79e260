//! Vector Fitting Tests
//!
//! End-to-end tests of the fitting engine on synthetic responses generated
//! from known rational models.
//!
//! Test coverage:
//! - Recovery of a single resonance (log grid, direct solver)
//! - Round trip for every solver strategy
//! - Conjugate pairing for all solver / polynomial-term combinations
//! - Stability of the relocated poles
//! - Scalar promotion
//! - Smart pole initialization and automatic order reduction

use ndarray::{Array1, Array2, Array3, Axis};
use num_complex::Complex64;
use std::f64::consts::PI;
use vecfit_core::vector_fitting::{
    FitConfig, FitState, InitPoleSpacing, InitStrategy, RationalModel, SolverKind, VectorFitting,
};
use vecfit_core::SampledResponse;

// ============================================================================
// Helper Functions
// ============================================================================

fn logspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    let (a, b) = (start.log10(), stop.log10());
    (0..n)
        .map(|i| 10f64.powf(a + (b - a) * i as f64 / (n - 1) as f64))
        .collect()
}

fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| start + (stop - start) * i as f64 / (n - 1) as f64)
        .collect()
}

/// Single resonance: p = 2pi(-1e7 + j1e8), r = 2pi 1e7 (1 + 0.5j)
fn resonance_model() -> RationalModel {
    let p = Complex64::new(-1e7, 1e8) * 2.0 * PI;
    let r = Complex64::new(1.0, 0.5) * 2.0 * PI * 1e7;
    let residues = Array3::from_shape_vec((2, 1, 1), vec![r, r.conj()]).unwrap();
    RationalModel::new(
        Array1::from_vec(vec![p, p.conj()]),
        residues,
        None,
        None,
        None,
    )
    .unwrap()
}

/// 2x2 model with one real pole, one pair and a constant term
fn two_port_model() -> RationalModel {
    let p_real = Complex64::new(-2e8, 0.0) * 2.0 * PI;
    let p_cpx = Complex64::new(-3e7, 4e8) * 2.0 * PI;

    let r_real = [1.0, 0.3, 0.3, 0.6];
    let r_cpx = [
        Complex64::new(0.2, 0.1),
        Complex64::new(-0.05, 0.02),
        Complex64::new(-0.05, 0.02),
        Complex64::new(0.15, -0.08),
    ];

    let mut residues = Array3::<Complex64>::zeros((3, 2, 2));
    for (k, (&rr, &rc)) in r_real.iter().zip(r_cpx.iter()).enumerate() {
        let (i, j) = (k / 2, k % 2);
        residues[[0, i, j]] = Complex64::new(rr, 0.0) * 2.0 * PI * 1e8;
        residues[[1, i, j]] = rc * 2.0 * PI * 1e8;
        residues[[2, i, j]] = rc.conj() * 2.0 * PI * 1e8;
    }

    RationalModel::new(
        Array1::from_vec(vec![p_real, p_cpx, p_cpx.conj()]),
        residues,
        Some(Array2::from_shape_vec((2, 2), vec![0.2, 0.05, 0.05, 0.3]).unwrap()),
        None,
        None,
    )
    .unwrap()
}

fn sample(model: &RationalModel, freqs: Vec<f64>) -> SampledResponse {
    let data = model.evaluate(&freqs);
    SampledResponse::new(freqs, data).unwrap()
}

fn assert_pole_recovered(model: &RationalModel, target: Complex64, rel_tol: f64) {
    let closest = model
        .poles()
        .iter()
        .map(|p| (p - target).norm())
        .fold(f64::INFINITY, f64::min);
    assert!(
        closest <= rel_tol * target.norm(),
        "pole {} not recovered (closest distance {})",
        target,
        closest
    );
}

fn assert_conjugate_pairs(model: &RationalModel) {
    let poles = model.poles();
    let residues = model.residues();
    let mut k = 0;
    while k < poles.len() {
        if poles[k].im == 0.0 {
            k += 1;
            continue;
        }
        assert!(k + 1 < poles.len(), "pole {} has no partner", poles[k]);
        assert_eq!(poles[k + 1], poles[k].conj());
        let r0 = residues.index_axis(Axis(0), k);
        let r1 = residues.index_axis(Axis(0), k + 1);
        for (a, b) in r0.iter().zip(r1.iter()) {
            assert_eq!(*b, a.conj());
        }
        k += 2;
    }
}

// ============================================================================
// Convergence
// ============================================================================

/// One resonance, 50 log points from 1 Hz to 1 GHz, one starting pair
#[test]
fn test_resonance_recovery_direct() {
    let truth = resonance_model();
    let response = sample(&truth, logspace(1.0, 1e9, 50));

    let cfg = FitConfig::default()
        .with_poles(0, 1)
        .with_solver(SolverKind::Direct)
        .with_tolerance(1e-3)
        .with_max_steps(5);
    let mut vf = VectorFitting::new(response, cfg).unwrap();
    let model = vf.fit().unwrap().clone();

    let report = vf.report();
    assert_eq!(report.state, FitState::Converged);
    assert!(report.err_max < 1e-3, "err_max = {}", report.err_max);
    assert!(report.steps <= 5);

    for &p in truth.poles().iter() {
        assert_pole_recovered(&model, p, 0.01);
    }
}

#[test]
fn test_round_trip_all_solvers() {
    let truth = two_port_model();
    let freqs = linspace(1e7, 1e9, 120);

    for solver in [SolverKind::Direct, SolverKind::Relaxed, SolverKind::FastRelaxed] {
        let cfg = FitConfig::default()
            .with_poles(1, 1)
            .with_terms(true, false, false)
            .with_solver(solver)
            .with_tolerance(1e-6)
            .with_max_steps(10);
        let mut vf = VectorFitting::new(sample(&truth, freqs.clone()), cfg).unwrap();
        let model = vf.fit().unwrap().clone();

        let report = vf.report();
        assert!(
            report.err_max < 1e-6,
            "{:?}: err_max = {}",
            solver,
            report.err_max
        );
        assert!(vf.converged());
        assert_eq!(model.model_order(), 3);
        for &p in truth.poles().iter() {
            assert_pole_recovered(&model, p, 1e-4);
        }
        let d = model.constant().unwrap();
        assert!((d[[1, 1]] - 0.3).abs() < 1e-4);
    }
}

#[test]
fn test_log_spacing_round_trip() {
    let truth = two_port_model();
    let cfg = FitConfig::default()
        .with_poles(1, 1)
        .with_init(InitStrategy::Default(InitPoleSpacing::Logarithmic))
        .with_terms(true, false, false)
        .with_tolerance(1e-6)
        .with_max_steps(10);
    let mut vf = VectorFitting::new(sample(&truth, linspace(1e7, 1e9, 120)), cfg).unwrap();
    vf.fit().unwrap();
    assert!(vf.converged());
}

// ============================================================================
// Structural invariants
// ============================================================================

#[test]
fn test_conjugate_pairing_all_configurations() {
    let response = sample(&two_port_model(), linspace(1e7, 1e9, 80));
    let term_sets = [
        (false, false, false),
        (true, false, false),
        (true, true, false),
        (true, true, true),
    ];

    for solver in [SolverKind::Direct, SolverKind::Relaxed, SolverKind::FastRelaxed] {
        for &(constant, proportional, origin) in term_sets.iter() {
            let cfg = FitConfig::default()
                .with_poles(1, 2)
                .with_terms(constant, proportional, origin)
                .with_solver(solver)
                .with_max_steps(3);
            let mut vf = VectorFitting::new(response.clone(), cfg).unwrap();
            let model = vf.fit().unwrap();

            assert_conjugate_pairs(model);
            assert_eq!(model.constant().is_some(), constant);
            assert_eq!(model.proportional().is_some(), proportional);
            assert_eq!(model.pole_at_origin().is_some(), origin);
        }
    }
}

#[test]
fn test_poles_are_stable_after_iterations() {
    // Data generated with an unstable pole pair
    let p = Complex64::new(5e7, 3e8) * 2.0 * PI;
    let r = Complex64::new(1e8, 0.0) * 2.0 * PI;
    let freqs = linspace(1e7, 1e9, 100);
    let data = Array3::from_shape_fn((freqs.len(), 1, 1), |(f, _, _)| {
        let s = Complex64::new(0.0, 2.0 * PI * freqs[f]);
        r / (s - p) + r.conj() / (s - p.conj())
    });
    let response = SampledResponse::new(freqs, data).unwrap();

    for solver in [SolverKind::Direct, SolverKind::Relaxed, SolverKind::FastRelaxed] {
        let cfg = FitConfig::default()
            .with_poles(0, 2)
            .with_solver(solver)
            .with_max_steps(4);
        let mut vf = VectorFitting::new(response.clone(), cfg).unwrap();
        let model = vf.fit().unwrap();
        assert!(
            model.poles().iter().all(|p| p.re <= 0.0),
            "{:?} produced an unstable pole",
            solver
        );
    }
}

#[test]
fn test_scalar_promotion_gives_identical_fit() {
    let truth = resonance_model();
    let freqs = logspace(1e6, 1e9, 60);
    let samples: Vec<Complex64> = truth.evaluate(&freqs).iter().copied().collect();

    let scalar = SampledResponse::from_scalar(freqs.clone(), samples.clone()).unwrap();
    let matrix =
        SampledResponse::new(freqs, Array3::from_shape_vec((60, 1, 1), samples).unwrap()).unwrap();

    let cfg = FitConfig::default().with_poles(0, 1);
    let mut vf_scalar = VectorFitting::new(scalar, cfg.clone()).unwrap();
    let mut vf_matrix = VectorFitting::new(matrix, cfg).unwrap();

    let a = vf_scalar.fit().unwrap().clone();
    let b = vf_matrix.fit().unwrap();
    assert_eq!(a.poles(), b.poles());
    assert_eq!(a.residues(), b.residues());
}

// ============================================================================
// Initialization and reduction
// ============================================================================

#[test]
fn test_smart_init_converges() {
    let truth = resonance_model();
    let cfg = FitConfig::default()
        .with_init(InitStrategy::Smart)
        .with_solver(SolverKind::FastRelaxed)
        .with_max_steps(10);
    let mut vf = VectorFitting::new(sample(&truth, linspace(1e6, 3e8, 200)), cfg).unwrap();
    let model = vf.fit().unwrap().clone();

    assert!(vf.converged(), "err_max = {}", vf.report().err_max);
    assert_pole_recovered(&model, truth.poles()[0], 0.01);
}

#[test]
fn test_autoreduce_keeps_accuracy() {
    let truth = two_port_model();
    let cfg = FitConfig::default()
        .with_poles(2, 3)
        .with_terms(true, false, false)
        .with_solver(SolverKind::FastRelaxed)
        .with_autoreduce(true)
        .with_max_steps(8);
    let mut vf = VectorFitting::new(sample(&truth, linspace(1e7, 1e9, 150)), cfg).unwrap();
    let order = vf.fit().unwrap().model_order();

    assert!(vf.converged(), "err_max = {}", vf.report().err_max);
    assert!(order <= 8);
    assert!(order >= 1);
}

#[test]
fn test_exhaustion_is_reported_not_raised() {
    // A single real pole cannot describe a sharp resonance
    let cfg = FitConfig::default()
        .with_poles(1, 0)
        .with_terms(false, false, false)
        .with_tolerance(1e-9)
        .with_max_steps(2);
    let mut vf = VectorFitting::new(sample(&resonance_model(), logspace(1e6, 1e9, 60)), cfg)
        .unwrap();

    assert!(vf.fit().is_ok());
    assert_eq!(vf.state(), FitState::Exhausted);
    assert!(vf.report().err_max >= 1e-9);
    assert!(vf.model().is_some());
}

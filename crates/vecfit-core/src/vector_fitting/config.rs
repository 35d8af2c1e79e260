//! Fitting configuration

use super::basis::PolynomialTerms;
use super::constants::{DEFAULT_MAX_STEPS, DEFAULT_TOLERANCE};
use super::init::InitPoleSpacing;
use super::solver::{DirectSolver, FastRelaxedSolver, RelaxedSolver, ResidueSolver};

/// How the starting poles are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStrategy {
    /// `n_real` / `n_complex` poles spread over the band
    Default(InitPoleSpacing),
    /// Poles placed at magnitude peaks and phase transitions of the data
    Smart,
}

impl Default for InitStrategy {
    fn default() -> Self {
        InitStrategy::Default(InitPoleSpacing::Linear)
    }
}

/// Residue identification strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SolverKind {
    #[default]
    Direct,
    Relaxed,
    FastRelaxed,
}

impl SolverKind {
    pub fn solver(self) -> Box<dyn ResidueSolver> {
        match self {
            SolverKind::Direct => Box::new(DirectSolver),
            SolverKind::Relaxed => Box::new(RelaxedSolver),
            SolverKind::FastRelaxed => Box::new(FastRelaxedSolver),
        }
    }
}

/// Configuration of a [`super::VectorFitting`] run
#[derive(Debug, Clone)]
pub struct FitConfig {
    /// Number of initial real poles (ignored by [`InitStrategy::Smart`])
    pub n_real: usize,
    /// Number of initial complex conjugate pole pairs (ignored by
    /// [`InitStrategy::Smart`])
    pub n_complex: usize,
    pub init: InitStrategy,
    pub solver: SolverKind,
    /// Drop poles that do not contribute to the fit between iterations
    pub autoreduce: bool,
    pub fit_constant: bool,
    pub fit_proportional: bool,
    pub fit_pole_at_origin: bool,
    /// Convergence threshold on the maximum relative error
    pub tolerance: f64,
    pub max_steps: usize,
    /// Log per-step progress at info instead of debug level
    pub debug: bool,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            n_real: 1,
            n_complex: 2,
            init: InitStrategy::default(),
            solver: SolverKind::default(),
            autoreduce: false,
            fit_constant: true,
            fit_proportional: true,
            fit_pole_at_origin: false,
            tolerance: DEFAULT_TOLERANCE,
            max_steps: DEFAULT_MAX_STEPS,
            debug: false,
        }
    }
}

impl FitConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of starting poles
    pub fn with_poles(mut self, n_real: usize, n_complex: usize) -> Self {
        self.n_real = n_real;
        self.n_complex = n_complex;
        self
    }

    pub fn with_init(mut self, init: InitStrategy) -> Self {
        self.init = init;
        self
    }

    pub fn with_solver(mut self, solver: SolverKind) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_autoreduce(mut self, autoreduce: bool) -> Self {
        self.autoreduce = autoreduce;
        self
    }

    /// Select the polynomial terms fitted alongside the poles
    pub fn with_terms(mut self, constant: bool, proportional: bool, pole_at_origin: bool) -> Self {
        self.fit_constant = constant;
        self.fit_proportional = proportional;
        self.fit_pole_at_origin = pole_at_origin;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub(crate) fn terms(&self) -> PolynomialTerms {
        PolynomialTerms {
            constant: self.fit_constant,
            proportional: self.fit_proportional,
            pole_at_origin: self.fit_pole_at_origin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = FitConfig::default();
        assert_eq!(cfg.n_real, 1);
        assert_eq!(cfg.n_complex, 2);
        assert_eq!(cfg.solver, SolverKind::Direct);
        assert_eq!(cfg.tolerance, 1e-3);
        assert_eq!(cfg.max_steps, 5);
        assert!(cfg.fit_constant && cfg.fit_proportional && !cfg.fit_pole_at_origin);
    }

    #[test]
    fn test_builder() {
        let cfg = FitConfig::new()
            .with_poles(0, 4)
            .with_solver(SolverKind::FastRelaxed)
            .with_terms(false, false, true)
            .with_tolerance(1e-6);

        assert_eq!((cfg.n_real, cfg.n_complex), (0, 4));
        assert_eq!(cfg.solver.solver().name(), "fast-relaxed");
        let terms = cfg.terms();
        assert!(!terms.constant && terms.pole_at_origin);
        assert_eq!(cfg.tolerance, 1e-6);
    }
}

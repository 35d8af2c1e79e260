//! Core VectorFitting engine and convergence loop

use ndarray::Array2;
use num_complex::Complex64;
use std::f64::consts::PI;
use tracing::{debug, info, warn};

use super::basis::build_basis;
use super::config::{FitConfig, InitStrategy};
use super::init::{default_poles, smart_poles};
use super::model::{relative_error, RationalModel};
use super::poles::{HalfModel, PoleSet};
use super::reduction::reduce_order;
use super::relocation::relocate_poles;
use super::solver::ResidueSolver;
use crate::error::{Result, VectorFitError};
use crate::response::SampledResponse;

/// Where the engine is in its fitting procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitState {
    /// No fit has completed the initial residue solve yet
    Initializing,
    /// Pole relocation in progress
    Iterating,
    /// `err_max` dropped below the tolerance
    Converged,
    /// `max_steps` iterations ran without reaching the tolerance; the last
    /// model is still available
    Exhausted,
}

/// Summary of the last fit
#[derive(Debug, Clone, Copy)]
pub struct FitReport {
    pub err_max: f64,
    pub err_mean: f64,
    /// Relocation steps performed (0 when the initial poles already fit)
    pub steps: usize,
    pub state: FitState,
    /// Number of real poles in the final model
    pub n_real: usize,
    /// Number of conjugate pairs in the final model
    pub n_complex: usize,
}

/// Vector fitting engine
///
/// Owns the sampled response and the mutable fitting state. Every call to
/// [`VectorFitting::fit`] starts again from the configured initial poles.
#[derive(Debug)]
pub struct VectorFitting {
    response: SampledResponse,
    config: FitConfig,
    solver: Box<dyn ResidueSolver>,

    /// Data per channel [n_channels, nfreq]
    channels: Array2<Complex64>,
    /// Angular frequencies normalized by `freq_scale`
    omega: Vec<f64>,
    freq_scale: f64,

    half: HalfModel,
    model: Option<RationalModel>,
    err_max: f64,
    err_mean: f64,
    steps: usize,
    state: FitState,
}

impl VectorFitting {
    /// Create an engine using the solver selected in `config`
    pub fn new(response: SampledResponse, config: FitConfig) -> Result<Self> {
        let solver = config.solver.solver();
        Self::with_solver(response, config, solver)
    }

    /// Create an engine with a custom residue solver
    pub fn with_solver(
        response: SampledResponse,
        config: FitConfig,
        solver: Box<dyn ResidueSolver>,
    ) -> Result<Self> {
        if !(config.tolerance.is_finite() && config.tolerance > 0.0) {
            return Err(VectorFitError::InvalidConfig(format!(
                "tolerance must be positive, got {}",
                config.tolerance
            )));
        }
        if matches!(config.init, InitStrategy::Default(_)) && config.n_real + config.n_complex == 0
        {
            return Err(VectorFitError::InvalidConfig(
                "at least one starting pole is required".to_string(),
            ));
        }

        let freq_scale = response.max_freq();
        let omega = response
            .freqs()
            .iter()
            .map(|f| 2.0 * PI * f / freq_scale)
            .collect();
        let channels = response.channels();

        Ok(Self {
            response,
            config,
            solver,
            channels,
            omega,
            freq_scale,
            half: HalfModel::default(),
            model: None,
            err_max: f64::INFINITY,
            err_mean: f64::INFINITY,
            steps: 0,
            state: FitState::Initializing,
        })
    }

    /// Run the fitting procedure
    ///
    /// Returns the last model both on convergence and when the step budget
    /// is exhausted; check [`VectorFitting::state`] to tell them apart.
    pub fn fit(&mut self) -> Result<&RationalModel> {
        self.state = FitState::Initializing;
        self.model = None;
        self.steps = 0;

        let omega_max = 2.0 * PI;
        let poles = match self.config.init {
            InitStrategy::Default(spacing) => default_poles(
                omega_max,
                self.config.n_real,
                self.config.n_complex,
                spacing,
            ),
            InitStrategy::Smart => smart_poles(&self.channels, &self.omega),
        };

        let mut model = self.solve(&poles)?;
        self.log_step();

        if self.err_max < self.config.tolerance {
            self.state = FitState::Converged;
            return Ok(&*self.model.insert(model));
        }

        self.state = FitState::Iterating;
        for step in 0..self.config.max_steps {
            if self.config.autoreduce && step > 0 {
                reduce_order(
                    &mut self.half,
                    &self.response,
                    self.freq_scale,
                    self.config.tolerance,
                );
            }

            let mut poles = relocate_poles(&self.half, omega_max)?;
            poles.stabilize();
            model = self.solve(&poles)?;
            self.steps = step + 1;
            self.log_step();

            if self.err_max < self.config.tolerance {
                self.state = FitState::Converged;
                return Ok(&*self.model.insert(model));
            }
        }

        self.state = FitState::Exhausted;
        warn!(
            err_max = self.err_max,
            tolerance = self.config.tolerance,
            steps = self.steps,
            "vector fitting did not converge"
        );
        Ok(&*self.model.insert(model))
    }

    /// Solve residues for `poles`, rebuild the model and update the errors
    fn solve(&mut self, poles: &PoleSet) -> Result<RationalModel> {
        let basis = build_basis(poles, &self.omega, self.config.terms());
        let shape = (self.response.n_outputs(), self.response.n_inputs());
        let solution = self.solver.solve(&basis, &self.channels, shape)?;

        self.half = HalfModel::from_solution(poles, solution);
        let model = self.half.expand(self.freq_scale, shape);

        let fit = model.evaluate(self.response.freqs());
        let (err_max, err_mean) = relative_error(self.response.data(), &fit);
        self.err_max = err_max;
        self.err_mean = err_mean;

        Ok(model)
    }

    fn log_step(&self) {
        let (n_real, n_complex) = (self.half.real.len(), self.half.complex.len());
        if self.config.debug {
            info!(
                step = self.steps,
                solver = self.solver.name(),
                err_max = self.err_max,
                err_mean = self.err_mean,
                n_real,
                n_complex,
                "vector fitting step"
            );
        } else {
            debug!(
                step = self.steps,
                solver = self.solver.name(),
                err_max = self.err_max,
                err_mean = self.err_mean,
                n_real,
                n_complex,
                "vector fitting step"
            );
        }
    }

    /// Fitted model, None before the first successful [`VectorFitting::fit`]
    pub fn model(&self) -> Option<&RationalModel> {
        self.model.as_ref()
    }

    pub fn state(&self) -> FitState {
        self.state
    }

    pub fn converged(&self) -> bool {
        self.state == FitState::Converged
    }

    pub fn report(&self) -> FitReport {
        FitReport {
            err_max: self.err_max,
            err_mean: self.err_mean,
            steps: self.steps,
            state: self.state,
            n_real: self.half.real.len(),
            n_complex: self.half.complex.len(),
        }
    }

    pub fn response(&self) -> &SampledResponse {
        &self.response
    }

    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    /// Frequency scale (Hz) used to normalize the grid
    pub fn freq_scale(&self) -> f64 {
        self.freq_scale
    }
}

use crate::config::NewtonParams;
use crate::linalg::{l2_norm, sparse_matrix::SparseMatrix, LinearSolveError, LinearSolverBackend};
use thiserror::Error;

/// Supplies the residual `F(x)` and Jacobian `J(x)` of a discretized nonlinear problem
pub trait ResidualJacobianProvider {
    fn num_dofs(&self) -> usize;

    /// Jacobian and residual at `coefficients`
    fn assemble(&self, coefficients: &[f64]) -> (SparseMatrix, Vec<f64>);

    fn residual(&self, coefficients: &[f64]) -> Vec<f64> {
        self.assemble(coefficients).1
    }
}

/// The quantity compared against the tolerance
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ConvergenceMeasure {
    /// `‖F(x)‖₂`
    #[default]
    ResidualNorm,
    /// `‖δ‖₂` of the last applied update
    UpdateNorm,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewtonOutcome {
    pub coefficients: Vec<f64>,
    /// Number of updates applied
    pub iterations: usize,
    /// Final value of the convergence measure
    pub norm: f64,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum NewtonError {
    #[error("Newton's method did not converge within {iterations} iterations (norm: {norm:.3e})!")]
    ConvergenceFailure { iterations: usize, norm: f64 },
    #[error("Newton's method produced a non-finite residual after {iterations} iterations!")]
    NonFinite { iterations: usize },
    #[error("Initial guess has {found} entries but the problem has {expected} DoFs!")]
    DimensionMismatch { expected: usize, found: usize },
    #[error(transparent)]
    LinearSolve(#[from] LinearSolveError),
}

/// Newton's method driven by a [LinearSolverBackend]
#[derive(Clone, Debug)]
pub struct NewtonSolver<L> {
    backend: L,
    max_iter: usize,
    convergence: ConvergenceMeasure,
}

impl<L: LinearSolverBackend> NewtonSolver<L> {
    pub fn new(backend: L, params: &NewtonParams) -> Self {
        Self {
            backend,
            max_iter: params.max_iter,
            convergence: params.convergence,
        }
    }

    /// Iterate `J δ = -F`, `x ← x + δ` from `initial` until the convergence measure drops below `tolerance`
    ///
    /// The test is made before each update, so an initial guess that already satisfies it is returned unchanged.
    pub fn solve<P>(
        &self,
        provider: &P,
        initial: Vec<f64>,
        tolerance: f64,
    ) -> Result<NewtonOutcome, NewtonError>
    where
        P: ResidualJacobianProvider + ?Sized,
    {
        if initial.len() != provider.num_dofs() {
            return Err(NewtonError::DimensionMismatch {
                expected: provider.num_dofs(),
                found: initial.len(),
            });
        }

        let mut coefficients = initial;
        let mut last_update_norm = f64::INFINITY;
        let mut iterations = 0;

        loop {
            let (jacobian, residual) = provider.assemble(&coefficients);
            let residual_norm = l2_norm(&residual);
            if !residual_norm.is_finite() {
                return Err(NewtonError::NonFinite { iterations });
            }

            let norm = match self.convergence {
                ConvergenceMeasure::ResidualNorm => residual_norm,
                ConvergenceMeasure::UpdateNorm => last_update_norm,
            };

            if norm < tolerance || residual_norm == 0.0 {
                return Ok(NewtonOutcome {
                    coefficients,
                    iterations,
                    norm,
                });
            }

            if iterations >= self.max_iter {
                return Err(NewtonError::ConvergenceFailure { iterations, norm });
            }

            let neg_residual: Vec<f64> = residual.iter().map(|r| -r).collect();
            let update = self.backend.solve(&jacobian, &neg_residual)?;

            for (c, d) in coefficients.iter_mut().zip(update.iter()) {
                *c += d;
            }
            last_update_norm = l2_norm(&update);
            iterations += 1;
        }
    }
}

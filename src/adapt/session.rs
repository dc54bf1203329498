use super::candidates::{CandidateScorer, ProjectionScorer};
use super::estimator::ErrorEstimator;
use super::selector::RefinementSelector;
use crate::config::AdaptivityParams;
use crate::diagnostics::{Event, IterationDiagnostics, Observer, StopReason};
use crate::domain::solution::FieldState;
use crate::error::{SolveError, SolvePhase};
use crate::linalg::LinearSolverBackend;
use crate::newton::NewtonSolver;
use crate::projection::{FieldSource, Projector};
use crate::weak_form::{DiscreteProblem, WeakForm};

/// The result of one adaptivity session
#[derive(Clone, Debug)]
pub struct SessionOutcome {
    /// The final coarse space and solution
    pub coarse: FieldState,
    /// The reference solution of the last iteration
    pub reference: FieldState,
    pub iterations: Vec<IterationDiagnostics>,
    pub stop: StopReason,
}

/// Alternates reference solves, error estimation and coarse space refinement within one time step
///
/// Every iteration builds a fresh reference space from the current coarse space (each leaf split isotropically,
/// each order increased by `order_increase`), so the reference space always has more DoFs than the coarse space.
pub struct AdaptivitySession<'a, W, L, S = ProjectionScorer> {
    pub form: &'a W,
    pub newton: &'a NewtonSolver<L>,
    pub projector: &'a dyn Projector,
    pub selector: &'a RefinementSelector<S>,
    pub params: &'a AdaptivityParams,
    /// Newton tolerance for the reference solves
    pub tolerance: f64,
}

impl<'a, W, L, S> AdaptivitySession<'a, W, L, S>
where
    W: WeakForm,
    L: LinearSolverBackend,
    S: CandidateScorer,
{
    /// Adapt `coarse` until the error estimate drops below `err_stop`, the coarse space reaches `ndof_stop` DoFs,
    /// or no refinement is selected
    ///
    /// `previous` is the solution at the previous time level.
    pub fn run<P, O>(
        &self,
        step: usize,
        mut coarse: FieldState,
        previous: &P,
        step_size: f64,
        observer: &mut O,
    ) -> Result<SessionOutcome, SolveError>
    where
        P: FieldSource + ?Sized,
        O: Observer + ?Sized,
    {
        let mut iterations = Vec::new();
        let mut warm_start: Option<FieldState> = None;
        let mut iteration = 0;

        loop {
            iteration += 1;
            let reference_space = coarse.space().reference_space(self.params.order_increase)?;

            let initial = match &warm_start {
                None => self.projector.project(&coarse, &reference_space),
                Some(last_reference) => self.projector.project(last_reference, &reference_space),
            };

            let problem = DiscreteProblem::new(self.form, &reference_space, previous, step_size);
            let solved = self
                .newton
                .solve(&problem, initial, self.tolerance)
                .map_err(SolveError::newton(SolvePhase::Adaptivity { step, iteration }))?;
            let reference = FieldState::from_coefficients(reference_space, solved.coefficients)?;

            let estimate = ErrorEstimator.estimate(&coarse.view(), &reference.view());

            let mut diagnostics = IterationDiagnostics {
                step,
                iteration,
                coarse_dof: coarse.space().num_dofs(),
                reference_dof: reference.space().num_dofs(),
                relative_error_percent: estimate.relative_error_percent,
                newton_iterations: solved.iterations,
                refined_elements: 0,
                stop: None,
            };

            let stop = if estimate.relative_error_percent < self.params.err_stop {
                Some(StopReason::ErrorBelowThreshold)
            } else if coarse.space().num_dofs() >= self.params.ndof_stop {
                Some(StopReason::DofLimit)
            } else {
                let (mut space, _) = coarse.into_parts();
                let adapted = self
                    .selector
                    .adapt(&mut space, &estimate, &reference, self.params)?;
                diagnostics.refined_elements = adapted.refined.len();

                let solution = self.projector.project_solution(&reference, &space)?;
                coarse = FieldState::new(space, solution)?;

                if adapted.done {
                    Some(StopReason::Saturated)
                } else if coarse.space().num_dofs() >= self.params.ndof_stop {
                    Some(StopReason::DofLimit)
                } else {
                    None
                }
            };

            diagnostics.stop = stop;
            observer.observe(&Event::IterationCompleted(&diagnostics));
            iterations.push(diagnostics);

            if let Some(stop) = stop {
                return Ok(SessionOutcome {
                    coarse,
                    reference,
                    iterations,
                    stop,
                });
            }

            warm_start = Some(reference);
        }
    }
}

use crate::adapt::{
    candidates::{CandidateScorer, ProjectionScorer},
    selector::RefinementSelector,
    session::AdaptivitySession,
};
use crate::config::SolverConfig;
use crate::diagnostics::{Event, Observer, StepDiagnostics};
use crate::domain::{mesh::Mesh, solution::FieldState, DiscreteSpace};
use crate::error::{SolveError, SolvePhase};
use crate::linalg::{block_lu::BlockLuSolver, LinearSolverBackend};
use crate::newton::NewtonSolver;
use crate::projection::{FieldSource, L2Projector, Projector};
use crate::weak_form::{DiscreteProblem, WeakForm};

/// A time dependent problem: the weak form of one time step, the domain and the initial condition
pub struct Problem<W, F> {
    /// The coarsest mesh; the coarse mesh is periodically reset to it
    pub base_mesh: Mesh,
    pub form: W,
    pub initial_condition: F,
}

impl<W: WeakForm, F: FieldSource> Problem<W, F> {
    pub fn new(base_mesh: Mesh, form: W, initial_condition: F) -> Self {
        Self {
            base_mesh,
            form,
            initial_condition,
        }
    }
}

/// The solution at the previous time level
#[derive(Clone, Debug)]
enum PreviousLevel {
    InitialCondition,
    Reference(FieldState),
}

/// Advances a [Problem] in time, running an [AdaptivitySession] in every step
///
/// Owns the coarse space and solution. Before the first step the initial condition is projected onto the initial
/// coarse space and one coarse Newton solve is made. Every `derefinement_period` steps (never on step 1) the coarse
/// mesh is reset to the base mesh with the initial uniform order.
pub struct TimeStepDriver<'a, W, F, L = BlockLuSolver, S = ProjectionScorer, P = L2Projector> {
    problem: &'a Problem<W, F>,
    config: SolverConfig,
    newton: NewtonSolver<L>,
    selector: RefinementSelector<S>,
    projector: P,
    coarse: Option<FieldState>,
    previous: PreviousLevel,
    steps_taken: usize,
}

impl<'a, W, F> TimeStepDriver<'a, W, F>
where
    W: WeakForm,
    F: FieldSource,
{
    /// A driver using [BlockLuSolver], the projection based candidate scorer and [L2Projector]
    pub fn new(problem: &'a Problem<W, F>, config: SolverConfig) -> Result<Self, SolveError> {
        Self::with_components(
            problem,
            config,
            BlockLuSolver::default(),
            RefinementSelector::from_params(&config.adaptivity),
            L2Projector,
        )
    }
}

impl<'a, W, F, L, S, P> TimeStepDriver<'a, W, F, L, S, P>
where
    W: WeakForm,
    F: FieldSource,
    L: LinearSolverBackend,
    S: CandidateScorer,
    P: Projector,
{
    pub fn with_components(
        problem: &'a Problem<W, F>,
        config: SolverConfig,
        backend: L,
        selector: RefinementSelector<S>,
        projector: P,
    ) -> Result<Self, SolveError> {
        config.validate()?;

        Ok(Self {
            problem,
            newton: NewtonSolver::new(backend, &config.newton),
            config,
            selector,
            projector,
            coarse: None,
            previous: PreviousLevel::InitialCondition,
            steps_taken: 0,
        })
    }

    /// The current coarse space and solution (`None` before the first step)
    pub fn coarse(&self) -> Option<&FieldState> {
        self.coarse.as_ref()
    }

    /// The reference solution of the last completed step
    pub fn previous_reference(&self) -> Option<&FieldState> {
        match &self.previous {
            PreviousLevel::InitialCondition => None,
            PreviousLevel::Reference(state) => Some(state),
        }
    }

    pub fn steps_taken(&self) -> usize {
        self.steps_taken
    }

    fn previous_source(&self) -> &dyn FieldSource {
        match &self.previous {
            PreviousLevel::InitialCondition => &self.problem.initial_condition,
            PreviousLevel::Reference(state) => state,
        }
    }

    /// Project the previous time level onto the base mesh (with the initial order) and solve one time step there
    fn coarse_solve(&self, step_size: f64, phase: SolvePhase) -> Result<(FieldState, usize), SolveError> {
        let space = DiscreteSpace::with_uniform_order(self.problem.base_mesh.clone(), self.config.initial_order)?;
        let previous = self.previous_source();

        let initial = self.projector.project(previous, &space);
        let problem = DiscreteProblem::new(&self.problem.form, &space, previous, step_size);
        let solved = self
            .newton
            .solve(&problem, initial, self.config.newton.tol_coarse)
            .map_err(SolveError::newton(phase))?;

        Ok((FieldState::from_coefficients(space, solved.coefficients)?, solved.iterations))
    }

    /// Take one time step
    pub fn step<O>(&mut self, step_size: f64, observer: &mut O) -> Result<StepDiagnostics, SolveError>
    where
        O: Observer + ?Sized,
    {
        if !(step_size.is_finite() && step_size > 0.0) {
            return Err(SolveError::InvalidStepSize(step_size));
        }

        let step = self.steps_taken + 1;

        let coarse = match self.coarse.take() {
            None => {
                let (coarse, newton_iterations) = self.coarse_solve(step_size, SolvePhase::Initial)?;
                observer.observe(&Event::InitialSolve {
                    coarse_dof: coarse.space().num_dofs(),
                    newton_iterations,
                });
                coarse
            }
            Some(coarse) => coarse,
        };

        let derefine = step > 1
            && self
                .config
                .derefinement_period
                .map_or(false, |period| step % period.get() == 0);

        let coarse = if derefine {
            let (coarse, newton_iterations) =
                self.coarse_solve(step_size, SolvePhase::Derefinement { step })?;
            observer.observe(&Event::Derefined {
                step,
                coarse_dof: coarse.space().num_dofs(),
                newton_iterations,
            });
            coarse
        } else {
            coarse
        };

        let session = AdaptivitySession {
            form: &self.problem.form,
            newton: &self.newton,
            projector: &self.projector,
            selector: &self.selector,
            params: &self.config.adaptivity,
            tolerance: self.config.newton.tol_fine,
        };
        let outcome = session.run(step, coarse, self.previous_source(), step_size, observer)?;

        self.coarse = Some(outcome.coarse);
        self.previous = PreviousLevel::Reference(outcome.reference);
        self.steps_taken = step;

        let diagnostics = StepDiagnostics {
            step,
            derefined: derefine,
            iterations: outcome.iterations,
        };
        observer.observe(&Event::StepCompleted(&diagnostics));

        Ok(diagnostics)
    }

    /// Take `step_count` time steps of size `step_size`
    pub fn run<O>(
        &mut self,
        step_count: usize,
        step_size: f64,
        observer: &mut O,
    ) -> Result<Vec<StepDiagnostics>, SolveError>
    where
        O: Observer + ?Sized,
    {
        (0..step_count)
            .map(|_| self.step(step_size, observer))
            .collect()
    }
}

/// Solve `problem` over `step_count` time steps of size `step_size`
///
/// Returns one [StepDiagnostics] per time step (each holding one record per adaptivity iteration).
pub fn solve_problem<W, F, O>(
    problem: &Problem<W, F>,
    step_count: usize,
    step_size: f64,
    config: &SolverConfig,
    observer: &mut O,
) -> Result<Vec<StepDiagnostics>, SolveError>
where
    W: WeakForm,
    F: FieldSource,
    O: Observer + ?Sized,
{
    TimeStepDriver::new(problem, *config)?.run(step_count, step_size, observer)
}

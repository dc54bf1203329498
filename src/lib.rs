/*!
hp-adaptive Newton time stepping for nonlinear 2D finite element problems.

A [`TimeStepDriver`] advances a [`Problem`] in time. In every time step an [`AdaptivitySession`] solves the
nonlinear system on a reference space (the coarse space with every element split and every order raised), estimates
the element-wise error of the coarse solution against it and refines the worst elements with their best scoring
h, p or hp candidate until the error or the DoF budget stops it.

```no_run
use fem_adapt_2d::prelude::*;

let mesh = Mesh::from_file("./test_input/square.json").unwrap();
let initial = AnalyticField::new(|p: &Point| {
    let val = (-20.0 * p.norm_squared()).exp();
    FieldValue::new(val, V2D::from([-40.0 * p.x * val, -40.0 * p.y * val]))
});
let problem = Problem::new(mesh, NonlinearReaction::default(), initial);
let config = SolverConfig::from_file("./test_input/solver_config.json").unwrap();

let steps = solve_problem(&problem, 10, 0.005, &config, &mut ConsoleReport).unwrap();
```
!*/

/// Error estimation, refinement selection and the per-step adaptivity loop
pub mod adapt;
/// Legendre shape functions
pub mod basis;
/// Solver parameters
pub mod config;
/// Progress records and observers
pub mod diagnostics;
/// Meshes, discrete spaces and solutions
pub mod domain;
pub mod error;
/// Gauss-Legendre quadrature
pub mod integration;
/// Sparse matrices and linear solvers
pub mod linalg;
/// Newton's method
pub mod newton;
/// Transfer of fields between spaces
pub mod projection;
pub mod time_stepping;
/// Weak forms of one time step
pub mod weak_form;

pub use adapt::session::AdaptivitySession;
pub use config::SolverConfig;
pub use error::SolveError;
pub use time_stepping::{solve_problem, Problem, TimeStepDriver};

pub mod prelude {
    pub use crate::adapt::{
        candidates::CandidateList, selector::RefinementSelector, session::AdaptivitySession,
        strategy::Strategy,
    };
    pub use crate::config::{AdaptivityParams, NewtonParams, SolverConfig};
    pub use crate::diagnostics::{ConsoleReport, Event, Observer, StepDiagnostics, StopReason};
    pub use crate::domain::{
        mesh::{
            space::{Point, Rect, V2D},
            Mesh, MeshRegularity,
        },
        solution::{FieldState, FieldValue},
        DiscreteSpace,
    };
    pub use crate::error::SolveError;
    pub use crate::projection::{AnalyticField, FieldSource, L2Projector, Projector};
    pub use crate::time_stepping::{solve_problem, Problem, TimeStepDriver};
    pub use crate::weak_form::{NonlinearReaction, TimeDiscretization, WeakForm};
}

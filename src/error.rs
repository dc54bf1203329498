use crate::config::ConfigError;
use crate::domain::{solution::SolutionError, SpaceError};
use crate::newton::NewtonError;

use std::fmt;
use thiserror::Error;

/// Where in the solution process a Newton solve was attempted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolvePhase {
    /// The solve on the initial coarse space, before time stepping begins
    Initial,
    /// The solve on the derefined coarse space at the start of a time step
    Derefinement { step: usize },
    /// The solve on the reference space of an adaptivity iteration
    Adaptivity { step: usize, iteration: usize },
}

impl fmt::Display for SolvePhase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Initial => write!(f, "initial coarse solve"),
            Self::Derefinement { step } => write!(f, "time step {} (derefined mesh)", step),
            Self::Adaptivity { step, iteration } => {
                write!(f, "time step {}, adaptivity step {}", step, iteration)
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum SolveError {
    #[error("Newton's method failed during the {phase}: {source}")]
    ConvergenceFailure {
        phase: SolvePhase,
        #[source]
        source: NewtonError,
    },
    #[error(transparent)]
    Space(#[from] SpaceError),
    #[error(transparent)]
    Solution(#[from] SolutionError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Step size must be positive and finite (got {0})!")]
    InvalidStepSize(f64),
}

impl SolveError {
    pub(crate) fn newton(phase: SolvePhase) -> impl FnOnce(NewtonError) -> Self {
        move |source| Self::ConvergenceFailure { phase, source }
    }
}

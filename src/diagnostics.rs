#[cfg(feature = "json_export")]
use json::{object, JsonValue};
#[cfg(feature = "json_export")]
use std::fs::File;
#[cfg(feature = "json_export")]
use std::io::Write;

use std::fmt;

/// Why an adaptivity session stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The relative error estimate dropped below `err_stop`
    ErrorBelowThreshold,
    /// The coarse space reached `ndof_stop` DoFs
    DofLimit,
    /// No admissible refinement was selected
    Saturated,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::ErrorBelowThreshold => write!(f, "error below threshold"),
            Self::DofLimit => write!(f, "DoF limit reached"),
            Self::Saturated => write!(f, "no refinements selected"),
        }
    }
}

/// A record of one adaptivity iteration
#[derive(Clone, Debug, PartialEq)]
pub struct IterationDiagnostics {
    pub step: usize,
    pub iteration: usize,
    pub coarse_dof: usize,
    pub reference_dof: usize,
    pub relative_error_percent: f64,
    pub newton_iterations: usize,
    pub refined_elements: usize,
    /// Set on the last iteration of a session
    pub stop: Option<StopReason>,
}

/// A record of one time step
#[derive(Clone, Debug, PartialEq)]
pub struct StepDiagnostics {
    pub step: usize,
    /// Was the coarse mesh reset to the base mesh at the start of this step
    pub derefined: bool,
    pub iterations: Vec<IterationDiagnostics>,
}

impl StepDiagnostics {
    pub fn final_iteration(&self) -> Option<&IterationDiagnostics> {
        self.iterations.last()
    }
}

/// Progress reported by the [TimeStepDriver](crate::time_stepping::TimeStepDriver)
#[derive(Clone, Copy, Debug)]
pub enum Event<'a> {
    /// The initial condition was projected and solved on the initial coarse space
    InitialSolve {
        coarse_dof: usize,
        newton_iterations: usize,
    },
    /// The coarse space was reset to the base mesh and solved
    Derefined {
        step: usize,
        coarse_dof: usize,
        newton_iterations: usize,
    },
    IterationCompleted(&'a IterationDiagnostics),
    StepCompleted(&'a StepDiagnostics),
}

/// Receives [Event]s as the solution progresses
///
/// Closures `FnMut(&Event)` are Observers; `()` ignores every event.
pub trait Observer {
    fn observe(&mut self, event: &Event);
}

impl<F> Observer for F
where
    F: FnMut(&Event),
{
    fn observe(&mut self, event: &Event) {
        self(event)
    }
}

impl Observer for () {
    fn observe(&mut self, _: &Event) {}
}

/// Prints a line to stdout for each [Event]
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleReport;

impl Observer for ConsoleReport {
    fn observe(&mut self, event: &Event) {
        match event {
            Event::InitialSolve {
                coarse_dof,
                newton_iterations,
            } => println!(
                "Initial condition: ndof: {}, Newton iterations: {}",
                coarse_dof, newton_iterations
            ),
            Event::Derefined {
                step,
                coarse_dof,
                newton_iterations,
            } => println!(
                "Time step {}: global mesh derefinement; ndof: {}, Newton iterations: {}",
                step, coarse_dof, newton_iterations
            ),
            Event::IterationCompleted(it) => {
                print!(
                    "Time step {}, adaptivity step {}: ndof: {}, ref_ndof: {}, err_est_rel: {:.4}%",
                    it.step, it.iteration, it.coarse_dof, it.reference_dof, it.relative_error_percent
                );
                match it.stop {
                    Some(reason) => println!(" ({})", reason),
                    None => println!(" ({} elements refined)", it.refined_elements),
                }
            }
            Event::StepCompleted(step) => println!(
                "Time step {} complete after {} adaptivity steps",
                step.step,
                step.iterations.len()
            ),
        }
    }
}

#[cfg(feature = "json_export")]
impl From<&IterationDiagnostics> for JsonValue {
    fn from(it: &IterationDiagnostics) -> Self {
        let stop = match it.stop {
            Some(reason) => JsonValue::from(reason.to_string()),
            None => JsonValue::Null,
        };

        object! {
            "step": it.step,
            "iteration": it.iteration,
            "coarse_dof": it.coarse_dof,
            "reference_dof": it.reference_dof,
            "relative_error_percent": it.relative_error_percent,
            "newton_iterations": it.newton_iterations,
            "refined_elements": it.refined_elements,
            "stop": stop
        }
    }
}

#[cfg(feature = "json_export")]
impl From<&StepDiagnostics> for JsonValue {
    fn from(step: &StepDiagnostics) -> Self {
        let iterations: Vec<JsonValue> = step.iterations.iter().map(JsonValue::from).collect();

        object! {
            "step": step.step,
            "derefined": step.derefined,
            "iterations": iterations
        }
    }
}

/// Write the diagnostics of a solution process to a JSON file
#[cfg(feature = "json_export")]
pub fn export_diagnostics(steps: &[StepDiagnostics], path: impl AsRef<str>) -> std::io::Result<()> {
    let mut file = File::create(path.as_ref())?;
    let steps_json = JsonValue::from(steps.iter().map(JsonValue::from).collect::<Vec<JsonValue>>());
    steps_json.write_pretty(&mut file, 4)?;
    file.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iteration(iteration: usize, stop: Option<StopReason>) -> IterationDiagnostics {
        IterationDiagnostics {
            step: 1,
            iteration,
            coarse_dof: 36 * iteration,
            reference_dof: 256 * iteration,
            relative_error_percent: 12.5 / iteration as f64,
            newton_iterations: 3,
            refined_elements: 2,
            stop,
        }
    }

    #[test]
    fn closure_observers() {
        let mut seen = Vec::new();
        let mut observer = |event: &Event| {
            if let Event::IterationCompleted(it) = event {
                seen.push(it.iteration);
            }
        };

        let first = iteration(1, None);
        let second = iteration(2, Some(StopReason::Saturated));
        observer.observe(&Event::IterationCompleted(&first));
        observer.observe(&Event::InitialSolve {
            coarse_dof: 10,
            newton_iterations: 1,
        });
        observer.observe(&Event::IterationCompleted(&second));
        assert_eq!(seen, vec![1, 2]);

        ().observe(&Event::IterationCompleted(&first));
        ConsoleReport.observe(&Event::IterationCompleted(&second));
    }

    #[test]
    fn final_iteration() {
        let step = StepDiagnostics {
            step: 3,
            derefined: true,
            iterations: vec![iteration(1, None), iteration(2, Some(StopReason::DofLimit))],
        };
        assert_eq!(step.final_iteration().unwrap().stop, Some(StopReason::DofLimit));
    }

    #[cfg(feature = "json_export")]
    #[test]
    fn json_diagnostics() {
        let step = StepDiagnostics {
            step: 1,
            derefined: false,
            iterations: vec![iteration(1, None), iteration(2, Some(StopReason::ErrorBelowThreshold))],
        };
        let step_json = JsonValue::from(&step);

        assert_eq!(step_json["step"].as_usize(), Some(1));
        assert_eq!(step_json["iterations"].members().count(), 2);
        assert!(step_json["iterations"][0]["stop"].is_null());
        assert_eq!(
            step_json["iterations"][1]["stop"].as_str(),
            Some("error below threshold")
        );
        assert_eq!(step_json["iterations"][1]["coarse_dof"].as_usize(), Some(72));
    }
}

use super::candidates::{
    best_candidate, evaluate_candidates, CandidateLimits, CandidateScorer, ProjectionScorer,
    RefinementCandidate,
};
use super::estimator::ErrorEstimate;
use crate::config::AdaptivityParams;
use crate::domain::{DiscreteSpace, SpaceError};
use crate::projection::FieldSource;

use rayon::prelude::*;

/// The refinements chosen in one call to [RefinementSelector::adapt]
#[derive(Clone, Debug, PartialEq)]
pub struct AdaptOutcome {
    /// In descending order of the selected `Elem`s' errors
    pub refined: Vec<RefinementCandidate>,
    /// Nothing was refined
    pub done: bool,
}

/// Chooses elements with a [Strategy](super::strategy::Strategy) and refines each with its best candidate
#[derive(Clone, Debug)]
pub struct RefinementSelector<S = ProjectionScorer> {
    scorer: S,
}

impl RefinementSelector<ProjectionScorer> {
    pub fn from_params(params: &AdaptivityParams) -> Self {
        Self {
            scorer: ProjectionScorer {
                conv_exp: params.conv_exp,
            },
        }
    }
}

impl Default for RefinementSelector<ProjectionScorer> {
    fn default() -> Self {
        Self {
            scorer: ProjectionScorer::default(),
        }
    }
}

impl<S: CandidateScorer> RefinementSelector<S> {
    pub fn with_scorer(scorer: S) -> Self {
        Self { scorer }
    }

    /// The best admissible candidate of every element chosen by `params.strategy` (elements without one are skipped)
    pub fn select(
        &self,
        coarse: &DiscreteSpace,
        estimate: &ErrorEstimate,
        reference: &dyn FieldSource,
        params: &AdaptivityParams,
    ) -> Vec<RefinementCandidate> {
        let mesh = coarse.mesh();
        let limits = CandidateLimits {
            max_order: params.max_order,
            regularity: params.regularity,
        };

        let selected: Vec<usize> = params
            .strategy
            .select(&estimate.records, params.threshold)
            .into_iter()
            .filter(|id| coarse.elem_dofs(*id).is_some())
            .collect();

        let best: Vec<Option<RefinementCandidate>> = selected
            .into_par_iter()
            .map(|elem_id| {
                let candidates = evaluate_candidates(
                    mesh,
                    &mesh.elems[elem_id],
                    reference,
                    params.candidates,
                    &limits,
                    &self.scorer,
                );
                best_candidate(&candidates)
            })
            .collect();

        best.into_iter().flatten().collect()
    }

    /// Refine `coarse` according to the error estimate
    ///
    /// `coarse` receives a new id if anything is refined.
    pub fn adapt(
        &self,
        coarse: &mut DiscreteSpace,
        estimate: &ErrorEstimate,
        reference: &dyn FieldSource,
        params: &AdaptivityParams,
    ) -> Result<AdaptOutcome, SpaceError> {
        let refined = self.select(coarse, estimate, reference, params);
        coarse.apply_refinements(refined.iter().map(|c| (c.elem_id, c.refinement)).collect())?;

        Ok(AdaptOutcome {
            done: refined.is_empty(),
            refined,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapt::{estimator::ErrorEstimator, strategy::Strategy};
    use crate::domain::{
        mesh::{
            space::{Point, Rect, V2D},
            Mesh,
        },
        solution::{FieldState, FieldValue},
        Refinement,
    };
    use crate::projection::{AnalyticField, L2Projector, Projector};

    fn states(
        f: &AnalyticField<impl Fn(&Point) -> FieldValue + Sync>,
        order: u8,
    ) -> (FieldState, FieldState) {
        let coarse_space = DiscreteSpace::with_uniform_order(
            Mesh::rectangle(Rect::new(Point::new(-1.0, -1.0), Point::new(1.0, 1.0)), [2, 2]),
            order,
        )
        .unwrap();
        let reference_space = coarse_space.reference_space(1).unwrap();

        let coarse = L2Projector.project(f, &coarse_space);
        let reference = L2Projector.project(f, &reference_space);
        (
            FieldState::from_coefficients(coarse_space, coarse).unwrap(),
            FieldState::from_coefficients(reference_space, reference).unwrap(),
        )
    }

    fn peak() -> AnalyticField<impl Fn(&Point) -> FieldValue + Sync> {
        AnalyticField::new(|p: &Point| {
            let dx = p.x - 0.5;
            let dy = p.y - 0.5;
            let val = (-20.0 * (dx * dx + dy * dy)).exp();
            FieldValue::new(val, V2D::from([-40.0 * dx * val, -40.0 * dy * val]))
        })
    }

    #[test]
    fn refines_the_worst_element() {
        let (coarse, reference) = states(&peak(), 2);
        let estimate = ErrorEstimator.estimate(&coarse.view(), &reference.view());
        let worst = estimate.records[0].elem_id;

        let params = AdaptivityParams {
            strategy: Strategy::RelativeToMax,
            threshold: 0.9,
            ..AdaptivityParams::default()
        };
        let mut space = coarse.space().clone();
        let before = space.num_dofs();
        let outcome = RefinementSelector::from_params(&params)
            .adapt(&mut space, &estimate, &reference, &params)
            .unwrap();

        assert!(!outcome.done);
        assert_eq!(outcome.refined[0].elem_id, worst);
        assert!(space.num_dofs() > before);
        assert_ne!(space.id(), coarse.space().id());
        // the coarse solution no longer matches the refined space
        assert!(coarse.solution().bind(&space).is_err());
    }

    #[test]
    fn saturated_when_nothing_is_selected() {
        let (coarse, reference) = states(&peak(), 2);
        let estimate = ErrorEstimator.estimate(&coarse.view(), &reference.view());

        let params = AdaptivityParams {
            strategy: Strategy::Absolute,
            threshold: 1e6,
            ..AdaptivityParams::default()
        };
        let mut space = coarse.space().clone();
        let outcome = RefinementSelector::from_params(&params)
            .adapt(&mut space, &estimate, &reference, &params)
            .unwrap();

        assert!(outcome.done);
        assert!(outcome.refined.is_empty());
        assert_eq!(space.id(), coarse.space().id());
    }

    #[test]
    fn order_cap_limits_candidates() {
        let (coarse, reference) = states(&peak(), 2);
        let estimate = ErrorEstimator.estimate(&coarse.view(), &reference.view());

        let params = AdaptivityParams {
            threshold: 0.0,
            max_order: 2,
            ..AdaptivityParams::default()
        };
        let chosen =
            RefinementSelector::from_params(&params).select(coarse.space(), &estimate, &reference, &params);

        assert!(!chosen.is_empty());
        for candidate in chosen {
            assert!(matches!(
                candidate.refinement,
                Refinement::H(_, orders) if orders.max_order() <= 2
            ));
        }
    }
}

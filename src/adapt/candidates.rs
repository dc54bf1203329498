use super::estimator::h1_difference;
use crate::domain::{
    mesh::{
        elem::Elem,
        h_refinement::HRef,
        p_refinement::PolyOrders,
        space::Rect,
        violates_min_edge_length, Mesh, MeshRegularity,
    },
    Refinement,
};
use crate::projection::{project_onto_rect, FieldSource};

use smallvec::SmallVec;

/// The kinds of refinements considered for each selected `Elem`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CandidateList {
    /// Uniform order increases
    PIso,
    /// Order increases in either or both directions
    PAniso,
    /// Isotropic splits (children keep the parent's orders)
    HIso,
    /// Isotropic and directional splits (children keep the parent's orders)
    HAniso,
    /// Isotropic splits with reduced or retained child orders, and uniform order increases
    HpIso,
    /// Every candidate of the other lists
    HpAniso,
}

impl Default for CandidateList {
    fn default() -> Self {
        Self::HpAniso
    }
}

impl CandidateList {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "p_iso" => Some(Self::PIso),
            "p_aniso" => Some(Self::PAniso),
            "h_iso" => Some(Self::HIso),
            "h_aniso" => Some(Self::HAniso),
            "hp_iso" => Some(Self::HpIso),
            "hp_aniso" => Some(Self::HpAniso),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::PIso => "p_iso",
            Self::PAniso => "p_aniso",
            Self::HIso => "h_iso",
            Self::HAniso => "h_aniso",
            Self::HpIso => "hp_iso",
            Self::HpAniso => "hp_aniso",
        }
    }

    fn has_p(&self) -> bool {
        !matches!(self, Self::HIso | Self::HAniso)
    }

    fn has_h(&self) -> bool {
        !matches!(self, Self::PIso | Self::PAniso)
    }

    fn has_hp(&self) -> bool {
        matches!(self, Self::HpIso | Self::HpAniso)
    }

    fn anisotropic(&self) -> bool {
        matches!(self, Self::PAniso | Self::HAniso | Self::HpAniso)
    }

    /// Every refinement of `elem` in this list (before any filtering)
    pub fn refinements_of(&self, elem: &Elem) -> Vec<Refinement> {
        let PolyOrders { ni, nj } = elem.poly_orders;
        let mut refinements = Vec::new();

        if self.has_p() {
            refinements.push(Refinement::P(PolyOrders::from(ni + 1, nj + 1)));
            refinements.push(Refinement::P(PolyOrders::from(ni + 2, nj + 2)));
            if self.anisotropic() {
                refinements.push(Refinement::P(PolyOrders::from(ni + 1, nj)));
                refinements.push(Refinement::P(PolyOrders::from(ni, nj + 1)));
            }
        }

        if self.has_h() {
            let h_refs: &[HRef] = if self.anisotropic() {
                &[HRef::T, HRef::U, HRef::V]
            } else {
                &[HRef::T]
            };

            let mut child_orders: SmallVec<[PolyOrders; 3]> = SmallVec::new();
            child_orders.push(elem.poly_orders);
            if self.has_hp() {
                let reduced = PolyOrders::from(((ni + 1) / 2).max(1), ((nj + 1) / 2).max(1));
                if reduced != elem.poly_orders {
                    child_orders.push(reduced);
                }
                child_orders.push(PolyOrders::from(ni + 1, nj + 1));
            }

            for h_ref in h_refs {
                for orders in child_orders.iter() {
                    refinements.push(Refinement::H(*h_ref, *orders));
                }
            }
        }

        refinements
    }
}

/// Limits that a candidate must respect to be considered
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CandidateLimits {
    pub max_order: u8,
    pub regularity: MeshRegularity,
}

/// A possible refinement of one `Elem` along with its estimated benefit
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RefinementCandidate {
    pub elem_id: usize,
    pub refinement: Refinement,
    /// DoFs added by the refinement
    pub dof_cost: usize,
    /// H1 error of the best approximation of the reference solution after the refinement
    pub error: f64,
    pub score: f64,
}

/// Ranks refinement candidates
pub trait CandidateScorer: Sync {
    /// `current_error`: H1 error of the best approximation of the reference solution with the `Elem`'s current orders
    fn score(&self, current_error: f64, candidate_error: f64, dof_cost: usize) -> f64;
}

/// Errors below this fraction of the current error count as fully resolved
pub const RESOLVED_ERROR_FRACTION: f64 = 1e-10;

/// Scores candidates by the (logarithmic) error reduction per added DoF, `(ln e0 - ln e) / dofs^conv_exp`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectionScorer {
    pub conv_exp: f64,
}

impl Default for ProjectionScorer {
    fn default() -> Self {
        Self { conv_exp: 1.0 }
    }
}

impl CandidateScorer for ProjectionScorer {
    fn score(&self, current_error: f64, candidate_error: f64, dof_cost: usize) -> f64 {
        let floor = (current_error * RESOLVED_ERROR_FRACTION).max(f64::MIN_POSITIVE);
        let reduction = current_error.max(floor).ln() - candidate_error.max(floor).ln();
        reduction / (dof_cost as f64).powf(self.conv_exp)
    }
}

/// The sub-regions (and their orders) that make up `elem` after a refinement
pub fn refined_regions(elem: &Elem, refinement: &Refinement) -> SmallVec<[(Rect, PolyOrders); 4]> {
    match refinement {
        Refinement::P(orders) => smallvec::smallvec![(elem.bounds, *orders)],
        Refinement::H(h_ref, orders) => (0..h_ref.num_children())
            .map(|idx| (h_ref.loc(idx).sub_rect(&elem.bounds), *orders))
            .collect(),
    }
}

fn num_dofs_after(refinement: &Refinement) -> usize {
    match refinement {
        Refinement::P(orders) => orders.num_basis_fns(),
        Refinement::H(h_ref, orders) => h_ref.num_children() * orders.num_basis_fns(),
    }
}

/// Can `refinement` be applied to `elem` without leaving the admissible set of meshes and spaces
///
/// * every order must be within `max_order`
/// * the refinement must add DoFs
/// * h-refinements need a leaf of `mesh` whose split edges stay above the minimum edge length
/// * every child must be large enough to be split again when building a reference space
/// * every child must satisfy the regularity bound against the current leaves of `mesh`
pub fn is_admissible(mesh: &Mesh, elem: &Elem, refinement: &Refinement, limits: &CandidateLimits) -> bool {
    let orders = match refinement {
        Refinement::P(orders) | Refinement::H(_, orders) => *orders,
    };
    if orders.max_order() > limits.max_order || orders.ni == 0 || orders.nj == 0 {
        return false;
    }
    if num_dofs_after(refinement) <= elem.poly_orders.num_basis_fns() {
        return false;
    }

    match refinement {
        Refinement::P(_) => true,
        Refinement::H(h_ref, _) => {
            mesh.elem_is_h_refineable(elem.id, *h_ref).unwrap_or(false)
                && refined_regions(elem, refinement).iter().all(|(child, _)| {
                    !violates_min_edge_length(child, HRef::T)
                        && limits
                            .regularity
                            .admits(mesh.hanging_level(child, &[elem.id]))
                })
        }
    }
}

/// H1 error of the best approximation of `reference` over `elem` after applying `refinement`
pub fn approximation_error(reference: &dyn FieldSource, elem: &Elem, refinement: &Refinement) -> f64 {
    refined_regions(elem, refinement)
        .iter()
        .map(|(region, orders)| {
            let coefficients = project_onto_rect(reference, region, *orders);
            h1_difference(reference, region, *orders, region, &coefficients).difference
        })
        .sum::<f64>()
        .sqrt()
}

/// Evaluate every admissible candidate in `list` for `elem`
///
/// Returned in the order of [CandidateList::refinements_of]
pub fn evaluate_candidates(
    mesh: &Mesh,
    elem: &Elem,
    reference: &dyn FieldSource,
    list: CandidateList,
    limits: &CandidateLimits,
    scorer: &dyn CandidateScorer,
) -> Vec<RefinementCandidate> {
    let current_error = approximation_error(reference, elem, &Refinement::P(elem.poly_orders));
    let current_dofs = elem.poly_orders.num_basis_fns();

    list.refinements_of(elem)
        .into_iter()
        .filter(|refinement| is_admissible(mesh, elem, refinement, limits))
        .map(|refinement| {
            let dof_cost = num_dofs_after(&refinement) - current_dofs;
            let error = approximation_error(reference, elem, &refinement);
            RefinementCandidate {
                elem_id: elem.id,
                refinement,
                dof_cost,
                error,
                score: scorer.score(current_error, error, dof_cost),
            }
        })
        .collect()
}

/// The highest scoring candidate (ties go to the cheaper candidate, then to the earlier one)
pub fn best_candidate(candidates: &[RefinementCandidate]) -> Option<RefinementCandidate> {
    candidates.iter().fold(None, |best: Option<RefinementCandidate>, c| match best {
        Some(b) if b.score > c.score || (b.score == c.score && b.dof_cost <= c.dof_cost) => Some(b),
        _ => Some(*c),
    })
}

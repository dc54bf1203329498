use crate::basis::ElemBasis;
use crate::domain::{
    mesh::{p_refinement::PolyOrders, space::Rect},
    solution::{FieldValue, SolutionView},
};
use crate::integration::CellQuadrature;
use crate::projection::FieldSource;

use rayon::prelude::*;

/// The estimated error on one leaf `Elem` of the coarse space
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ErrorRecord {
    pub elem_id: usize,
    /// H1 norm of `reference - coarse` over the `Elem`
    pub absolute: f64,
    /// `absolute` relative to the H1 norm of the reference solution over the whole domain
    pub relative: f64,
}

impl ErrorRecord {
    /// The share of the squared total relative error carried by this `Elem`
    pub fn contribution(&self) -> f64 {
        self.relative * self.relative
    }
}

/// Element-wise error estimates for a coarse solution against a reference solution
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorEstimate {
    /// Sorted by descending error (ties broken by ascending `Elem` id)
    pub records: Vec<ErrorRecord>,
    /// H1 norm of `reference - coarse` over the domain
    pub total_error: f64,
    /// H1 norm of the reference solution over the domain
    pub reference_norm: f64,
    /// `100 * total_error / reference_norm`
    pub relative_error_percent: f64,
}

impl ErrorEstimate {
    pub fn max_contribution(&self) -> f64 {
        self.records.first().map_or(0.0, ErrorRecord::contribution)
    }

    pub fn total_contribution(&self) -> f64 {
        self.records.iter().map(ErrorRecord::contribution).sum()
    }

    pub fn record(&self, elem_id: usize) -> Option<&ErrorRecord> {
        self.records.iter().find(|r| r.elem_id == elem_id)
    }
}

/// Squared H1 norms of a difference field and of the field it is compared against, over one region
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct H1Norms {
    pub difference: f64,
    pub reference: f64,
}

/// Squared H1 norm of `source - candidate` and of `source` over `region`, where `candidate` is given by a leaf
/// expansion (`ElemBasis` orders + coefficients) defined on `basis_bounds`
///
/// Integrals are exact when `source` is piecewise polynomial over its cells.
pub fn h1_difference(
    source: &dyn FieldSource,
    region: &Rect,
    candidate_orders: PolyOrders,
    basis_bounds: &Rect,
    coefficients: &[f64],
) -> H1Norms {
    let mut norms = H1Norms::default();

    for cell in source.cells(region) {
        let quad = CellQuadrature::over(cell.bounds, cell.quadrature_points(candidate_orders.max_order()));
        let source_values = source.sample(&cell, &quad.xs, &quad.ys);
        let candidate_values =
            ElemBasis::sample(candidate_orders, basis_bounds, &quad.xs, &quad.ys).field(coefficients);

        for (p, _, w) in quad.points() {
            let s = source_values[p];
            let diff = FieldValue::new(
                s.value - candidate_values[p].value,
                s.gradient - candidate_values[p].gradient,
            );
            norms.difference += w * h1_density(&diff);
            norms.reference += w * h1_density(&s);
        }
    }

    norms
}

fn h1_density(f: &FieldValue) -> f64 {
    f.value * f.value + f.gradient.norm_squared()
}

/// Computes element-wise H1 errors of a coarse solution with respect to a reference solution
#[derive(Clone, Copy, Debug, Default)]
pub struct ErrorEstimator;

impl ErrorEstimator {
    /// Estimate the error of `coarse` on each of its leaves
    ///
    /// Leaf errors are computed independently (in parallel) and aggregated in `Elem` id order, so the result does
    /// not depend on the thread count.
    pub fn estimate(&self, coarse: &SolutionView, reference: &SolutionView) -> ErrorEstimate {
        // a bound view always carries one coefficient per DoF of its space
        let coefficients = coarse.solution().coefficients();
        let leaves: Vec<_> = coarse.space().leaves().collect();

        let leaf_norms: Vec<(usize, H1Norms)> = leaves
            .into_par_iter()
            .map(|(elem, dofs)| {
                (
                    elem.id,
                    h1_difference(reference, &elem.bounds, elem.poly_orders, &elem.bounds, &coefficients[dofs]),
                )
            })
            .collect();

        let total_sq: f64 = leaf_norms.iter().map(|(_, n)| n.difference).sum();
        let reference_sq: f64 = leaf_norms.iter().map(|(_, n)| n.reference).sum();
        let total_error = total_sq.sqrt();
        let reference_norm = reference_sq.sqrt();

        let mut records: Vec<ErrorRecord> = leaf_norms
            .iter()
            .map(|(elem_id, norms)| {
                let absolute = norms.difference.sqrt();
                ErrorRecord {
                    elem_id: *elem_id,
                    absolute,
                    relative: relative_to(absolute, reference_norm),
                }
            })
            .collect();
        records.sort_by(|a, b| {
            b.absolute
                .total_cmp(&a.absolute)
                .then(a.elem_id.cmp(&b.elem_id))
        });

        ErrorEstimate {
            records,
            total_error,
            reference_norm,
            relative_error_percent: 100.0 * relative_to(total_error, reference_norm),
        }
    }
}

fn relative_to(error: f64, norm: f64) -> f64 {
    if norm > 0.0 {
        error / norm
    } else if error > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

use crate::basis::ElemBasis;
use crate::domain::{
    mesh::{
        p_refinement::PolyOrders,
        space::{Point, Rect},
    },
    solution::{FieldState, FieldValue, Solution, SolutionError, SolutionView},
    DiscreteSpace,
};
use crate::integration::CellQuadrature;

use rayon::prelude::*;

/// Extra quadrature points (per direction) used when integrating against non-polynomial fields
pub const ANALYTIC_EXTRA_POINTS: usize = 4;

/// A region on which a [FieldSource] is smooth
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SourceCell {
    pub bounds: Rect,
    /// The leaf `Elem` of a discrete source that covers this cell
    pub elem_id: Option<usize>,
    /// Polynomial orders of the field on this cell (`None` if it is not a polynomial)
    pub orders: Option<PolyOrders>,
}

impl SourceCell {
    /// Number of Gauss-Legendre points (per direction) needed to integrate the product of this cell's field with
    /// a polynomial of order `target` exactly
    pub fn quadrature_points(&self, target: u8) -> usize {
        match self.orders {
            Some(orders) => target.max(orders.max_order()) as usize + 1,
            None => target as usize + 1 + ANALYTIC_EXTRA_POINTS,
        }
    }
}

/// A scalar field that can be integrated exactly (up to smoothness) against piecewise polynomials
///
/// Discrete sources split a region into cells that each lie within one of their leaf `Elem`s.
pub trait FieldSource: Sync {
    /// Cells covering the portion of `region` on which the field is defined (clipped to `region`)
    fn cells(&self, region: &Rect) -> Vec<SourceCell>;

    /// Sample the field on a grid of points within a cell (ordered `px`-major)
    fn sample(&self, cell: &SourceCell, xs: &[f64], ys: &[f64]) -> Vec<FieldValue>;
}

impl<T: FieldSource + ?Sized> FieldSource for &T {
    fn cells(&self, region: &Rect) -> Vec<SourceCell> {
        (**self).cells(region)
    }

    fn sample(&self, cell: &SourceCell, xs: &[f64], ys: &[f64]) -> Vec<FieldValue> {
        (**self).sample(cell, xs, ys)
    }
}

impl FieldSource for SolutionView<'_> {
    fn cells(&self, region: &Rect) -> Vec<SourceCell> {
        let mesh = self.space().mesh();
        mesh.leaves_overlapping(region)
            .into_iter()
            .filter_map(|elem_id| {
                let elem = &mesh.elems[elem_id];
                elem.bounds.intersection(region).map(|bounds| SourceCell {
                    bounds,
                    elem_id: Some(elem_id),
                    orders: Some(elem.poly_orders),
                })
            })
            .collect()
    }

    fn sample(&self, cell: &SourceCell, xs: &[f64], ys: &[f64]) -> Vec<FieldValue> {
        let elem_id = cell.elem_id.and_then(|id| Some((id, self.elem_coefficients(id)?)));
        match elem_id {
            Some((id, coefficients)) => {
                let elem = &self.space().mesh().elems[id];
                ElemBasis::sample(elem.poly_orders, &elem.bounds, xs, ys).field(coefficients)
            }
            None => vec![FieldValue::default(); xs.len() * ys.len()],
        }
    }
}

impl FieldSource for FieldState {
    fn cells(&self, region: &Rect) -> Vec<SourceCell> {
        self.view().cells(region)
    }

    fn sample(&self, cell: &SourceCell, xs: &[f64], ys: &[f64]) -> Vec<FieldValue> {
        self.view().sample(cell, xs, ys)
    }
}

/// A field given by a function of position returning its value and gradient
pub struct AnalyticField<F> {
    f: F,
}

impl<F> AnalyticField<F>
where
    F: Fn(&Point) -> FieldValue + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }

    pub fn at(&self, point: &Point) -> FieldValue {
        (self.f)(point)
    }
}

impl<F> FieldSource for AnalyticField<F>
where
    F: Fn(&Point) -> FieldValue + Sync,
{
    fn cells(&self, region: &Rect) -> Vec<SourceCell> {
        vec![SourceCell {
            bounds: *region,
            elem_id: None,
            orders: None,
        }]
    }

    fn sample(&self, _: &SourceCell, xs: &[f64], ys: &[f64]) -> Vec<FieldValue> {
        xs.iter()
            .flat_map(|x| ys.iter().map(move |y| (self.f)(&Point::new(*x, *y))))
            .collect()
    }
}

/// Transfers a field onto a [DiscreteSpace]
pub trait Projector: Sync {
    /// Coefficients of the projection of `source` in `target`'s DoF numbering
    fn project(&self, source: &dyn FieldSource, target: &DiscreteSpace) -> Vec<f64>;

    fn project_solution(
        &self,
        source: &dyn FieldSource,
        target: &DiscreteSpace,
    ) -> Result<Solution, SolutionError> {
        Solution::new(target, self.project(source, target))
    }
}

/// Element-wise L2 projection
///
/// The basis is discontinuous and orthogonal on each leaf, so every coefficient is an independent
/// `(f, φ_k) / (φ_k, φ_k)`. Integrals are taken over the intersections of the target leaves with the source cells.
/// Projecting a field that already lies in the target space reproduces it exactly.
#[derive(Clone, Copy, Debug, Default)]
pub struct L2Projector;

impl Projector for L2Projector {
    fn project(&self, source: &dyn FieldSource, target: &DiscreteSpace) -> Vec<f64> {
        let leaves: Vec<_> = target.leaves().map(|(elem, _)| elem).collect();

        leaves
            .into_par_iter()
            .flat_map_iter(|elem| project_onto_rect(source, &elem.bounds, elem.poly_orders))
            .collect()
    }
}

/// L2 projection of `source` onto the tensor Legendre expansion with `orders` over `bounds`
///
/// Only the portion of `source` inside `bounds` contributes.
pub fn project_onto_rect(source: &dyn FieldSource, bounds: &Rect, orders: PolyOrders) -> Vec<f64> {
    let mut rhs = vec![0.0; orders.num_basis_fns()];

    for cell in source.cells(bounds) {
        let quad = CellQuadrature::over(cell.bounds, cell.quadrature_points(orders.max_order()));
        let samples = source.sample(&cell, &quad.xs, &quad.ys);
        let basis = ElemBasis::sample(orders, bounds, &quad.xs, &quad.ys);
        let ny = quad.ys.len();

        for (k, ij) in orders.permutations().enumerate() {
            rhs[k] += quad
                .points()
                .map(|(p, _, w)| w * samples[p].value * basis.value(ij, [p / ny, p % ny]))
                .sum::<f64>();
        }
    }

    rhs.into_iter()
        .zip(ElemBasis::mass_diagonal(orders, bounds))
        .map(|(r, m)| r / m)
        .collect()
}

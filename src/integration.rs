use crate::basis::glq::{gauss_quadrature_points, scale_gauss_quad_points};
use crate::domain::mesh::space::{Point, Rect};
use std::sync::OnceLock;

/// Largest Gauss-Legendre rule kept in the shared table. Larger rules are computed on demand.
const MAX_TABULATED_POINTS: usize = 64;

static GAUSS_RULES: OnceLock<Vec<QuadratureRule>> = OnceLock::new();

/// A one dimensional quadrature rule over [-1, 1]
#[derive(Clone, Debug)]
pub struct QuadratureRule {
    pub points: Vec<f64>,
    pub weights: Vec<f64>,
}

impl QuadratureRule {
    /// The `n` point Gauss-Legendre rule (exact for polynomials up to degree `2n - 1`)
    pub fn gauss_legendre(n: usize) -> Self {
        let n = n.max(1);
        match GAUSS_RULES
            .get_or_init(|| (1..=MAX_TABULATED_POINTS).map(Self::compute).collect())
            .get(n - 1)
        {
            Some(rule) => rule.clone(),
            None => Self::compute(n),
        }
    }

    fn compute(n: usize) -> Self {
        let (points, weights) = gauss_quadrature_points(n);
        Self { points, weights }
    }

    /// Number of points needed to integrate a polynomial of the given degree exactly
    pub fn points_for_degree(degree: usize) -> usize {
        degree / 2 + 1
    }
}

/// A tensor-product Gauss-Legendre rule mapped onto a rectangular cell
///
/// Points are addressed `[px, py]` and flattened `px`-major (`px * ys.len() + py`)
#[derive(Clone, Debug)]
pub struct CellQuadrature {
    pub bounds: Rect,
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    pub wx: Vec<f64>,
    pub wy: Vec<f64>,
}

impl CellQuadrature {
    /// An `n` by `n` point rule over `bounds`
    pub fn over(bounds: Rect, n: usize) -> Self {
        let rule = QuadratureRule::gauss_legendre(n);
        let (jx, xs) = scale_gauss_quad_points(&rule.points, bounds.min.x, bounds.max.x);
        let (jy, ys) = scale_gauss_quad_points(&rule.points, bounds.min.y, bounds.max.y);

        Self {
            bounds,
            xs,
            ys,
            wx: rule.weights.iter().map(|w| w * jx).collect(),
            wy: rule.weights.iter().map(|w| w * jy).collect(),
        }
    }

    pub fn num_points(&self) -> usize {
        self.xs.len() * self.ys.len()
    }

    /// Iterate over `(flat index, point, weight)`
    pub fn points(&self) -> impl Iterator<Item = (usize, Point, f64)> + '_ {
        let ny = self.ys.len();
        self.xs.iter().zip(self.wx.iter()).enumerate().flat_map(move |(px, (x, wx))| {
            self.ys
                .iter()
                .zip(self.wy.iter())
                .enumerate()
                .map(move |(py, (y, wy))| (px * ny + py, Point::new(*x, *y), wx * wy))
        })
    }

    /// Integrate sampled values (ordered as [`CellQuadrature::points`])
    pub fn integrate(&self, samples: &[f64]) -> f64 {
        self.points().map(|(p, _, w)| w * samples[p]).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn tabulated_and_computed_rules_agree() {
        let small = QuadratureRule::gauss_legendre(5);
        assert_eq!(small.points.len(), 5);
        assert_abs_diff_eq!(small.weights.iter().sum::<f64>(), 2.0, epsilon = 1e-13);

        let large = QuadratureRule::gauss_legendre(MAX_TABULATED_POINTS + 2);
        assert_eq!(large.points.len(), MAX_TABULATED_POINTS + 2);
        assert_abs_diff_eq!(large.weights.iter().sum::<f64>(), 2.0, epsilon = 1e-10);

        assert_eq!(QuadratureRule::points_for_degree(5), 3);
        assert_eq!(QuadratureRule::points_for_degree(4), 3);
    }

    #[test]
    fn cell_integration() {
        let cell = CellQuadrature::over(Rect::new(Point::new(1.0, -1.0), Point::new(2.0, 1.0)), 3);
        assert_eq!(cell.num_points(), 9);

        // ∫∫ x^2 y^4 dx dy over [1, 2] x [-1, 1] = (7/3) (2/5)
        let samples: Vec<f64> = cell.points().map(|(_, p, _)| p.x.powi(2) * p.y.powi(4)).collect();
        assert_abs_diff_eq!(cell.integrate(&samples), 14.0 / 15.0, epsilon = 1e-13);
    }
}

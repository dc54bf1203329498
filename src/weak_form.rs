use crate::basis::ElemBasis;
use crate::domain::{
    mesh::{elem::Elem, space::Point},
    solution::FieldValue,
    DiscreteSpace,
};
use crate::integration::{CellQuadrature, QuadratureRule};
use crate::linalg::sparse_matrix::SparseMatrix;
use crate::newton::ResidualJacobianProvider;
use crate::projection::{FieldSource, ANALYTIC_EXTRA_POINTS};

use rayon::prelude::*;
use std::ops::Range;

/// A time-discrete weak form with element-local (reaction-type) integrands
///
/// The residual of test function `φ_k` is `∫ r(x, u, u_prev, τ) φ_k dA` and the Jacobian entry `(k, l)` is
/// `∫ ∂r/∂u (x, u, u_prev, τ) φ_l φ_k dA`.
pub trait WeakForm: Sync {
    /// Residual integrand `r`
    fn residual(&self, point: &Point, u: &FieldValue, u_prev: &FieldValue, step_size: f64) -> f64;

    /// Derivative of the residual integrand with respect to `u`
    fn jacobian(&self, point: &Point, u: &FieldValue, u_prev: &FieldValue, step_size: f64) -> f64;

    /// Polynomial degree (per direction) of the Jacobian and residual integrands when the solution has order
    /// `trial_order` and the previous time level is a polynomial of order `previous_order`
    fn integrand_degree(&self, trial_order: u8, previous_order: u8) -> usize;
}

/// Time discretization of the reaction form
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TimeDiscretization {
    ImplicitEuler,
    #[default]
    CrankNicolson,
}

/// `∂u/∂t + V(x) u + g u^3 = 0` with the harmonic potential `V(x) = potential_strength * |x|^2`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NonlinearReaction {
    pub potential_strength: f64,
    pub coupling: f64,
    pub discretization: TimeDiscretization,
}

impl Default for NonlinearReaction {
    fn default() -> Self {
        // V = m ω^2 |x|^2 / 2 with m = ω = 1
        Self {
            potential_strength: 0.5,
            coupling: 1.0,
            discretization: TimeDiscretization::default(),
        }
    }
}

impl NonlinearReaction {
    fn potential(&self, point: &Point) -> f64 {
        self.potential_strength * point.norm_squared()
    }

    fn reaction(&self, point: &Point, u: f64) -> f64 {
        self.potential(point) * u + self.coupling * u * u * u
    }

    fn reaction_derivative(&self, point: &Point, u: f64) -> f64 {
        self.potential(point) + 3.0 * self.coupling * u * u
    }
}

impl WeakForm for NonlinearReaction {
    fn residual(&self, point: &Point, u: &FieldValue, u_prev: &FieldValue, step_size: f64) -> f64 {
        let time_derivative = (u.value - u_prev.value) / step_size;
        match self.discretization {
            TimeDiscretization::ImplicitEuler => time_derivative + self.reaction(point, u.value),
            TimeDiscretization::CrankNicolson => {
                time_derivative
                    + 0.5 * (self.reaction(point, u.value) + self.reaction(point, u_prev.value))
            }
        }
    }

    fn jacobian(&self, point: &Point, u: &FieldValue, _: &FieldValue, step_size: f64) -> f64 {
        let reaction = self.reaction_derivative(point, u.value);
        match self.discretization {
            TimeDiscretization::ImplicitEuler => 1.0 / step_size + reaction,
            TimeDiscretization::CrankNicolson => 1.0 / step_size + 0.5 * reaction,
        }
    }

    fn integrand_degree(&self, trial_order: u8, previous_order: u8) -> usize {
        let p = trial_order as usize;
        let q = previous_order as usize;
        let cubic = match self.discretization {
            TimeDiscretization::ImplicitEuler => 3 * p,
            TimeDiscretization::CrankNicolson => 3 * p.max(q),
        };
        // (u^3 or u^2 φ_l) φ_k, V u φ_k, u_prev φ_k
        (cubic + p).max(2 * p + 2).max(p + q)
    }
}

/// The nonlinear system of one time step: a [WeakForm] discretized on a [DiscreteSpace], with the previous time
/// level given by any [FieldSource]
pub struct DiscreteProblem<'a, W, S: ?Sized> {
    form: &'a W,
    space: &'a DiscreteSpace,
    previous: &'a S,
    step_size: f64,
}

impl<'a, W, S> DiscreteProblem<'a, W, S>
where
    W: WeakForm,
    S: FieldSource + ?Sized,
{
    pub fn new(form: &'a W, space: &'a DiscreteSpace, previous: &'a S, step_size: f64) -> Self {
        Self {
            form,
            space,
            previous,
            step_size,
        }
    }

    pub fn space(&self) -> &DiscreteSpace {
        self.space
    }

    fn assemble_leaf(&self, elem: &Elem, dofs: Range<usize>, coefficients: &[f64]) -> LocalSystem {
        let orders = elem.poly_orders;
        let local_coefficients = &coefficients[dofs.clone()];
        let n = dofs.len();

        let mut residual = vec![0.0; n];
        let mut jacobian = vec![0.0; n * n];

        for cell in self.previous.cells(&elem.bounds) {
            let trial_order = orders.max_order();
            let num_points = match cell.orders {
                Some(prev) => QuadratureRule::points_for_degree(
                    self.form.integrand_degree(trial_order, prev.max_order()),
                ),
                None => {
                    QuadratureRule::points_for_degree(self.form.integrand_degree(trial_order, trial_order))
                        + ANALYTIC_EXTRA_POINTS
                }
            };

            let quad = CellQuadrature::over(cell.bounds, num_points);
            let ny = quad.ys.len();
            let basis = ElemBasis::sample(orders, &elem.bounds, &quad.xs, &quad.ys);
            let u = basis.field(local_coefficients);
            let u_prev = self.previous.sample(&cell, &quad.xs, &quad.ys);

            for (p, point, w) in quad.points() {
                let r = w * self.form.residual(&point, &u[p], &u_prev[p], self.step_size);
                let dr = w * self.form.jacobian(&point, &u[p], &u_prev[p], self.step_size);
                let phi: Vec<f64> = orders
                    .permutations()
                    .map(|ij| basis.value(ij, [p / ny, p % ny]))
                    .collect();

                for (k, phi_k) in phi.iter().enumerate() {
                    residual[k] += r * phi_k;
                    for (l, phi_l) in phi.iter().enumerate() {
                        jacobian[k * n + l] += dr * phi_k * phi_l;
                    }
                }
            }
        }

        let mut matrix = SparseMatrix::new(self.space.num_dofs());
        for (k, row) in dofs.clone().enumerate() {
            for (l, col) in dofs.clone().enumerate() {
                if jacobian[k * n + l] != 0.0 || k == l {
                    matrix.insert([row, col], jacobian[k * n + l]);
                }
            }
        }

        LocalSystem {
            dofs,
            residual,
            jacobian: matrix,
        }
    }
}

struct LocalSystem {
    dofs: Range<usize>,
    residual: Vec<f64>,
    jacobian: SparseMatrix,
}

impl<'a, W, S> ResidualJacobianProvider for DiscreteProblem<'a, W, S>
where
    W: WeakForm,
    S: FieldSource + ?Sized,
{
    fn num_dofs(&self) -> usize {
        self.space.num_dofs()
    }

    fn assemble(&self, coefficients: &[f64]) -> (SparseMatrix, Vec<f64>) {
        let leaves: Vec<_> = self.space.leaves().collect();

        let locals: Vec<LocalSystem> = leaves
            .into_par_iter()
            .map(|(elem, dofs)| self.assemble_leaf(elem, dofs, coefficients))
            .collect();

        let mut residual = vec![0.0; self.space.num_dofs()];
        for local in locals.iter() {
            residual[local.dofs.clone()].copy_from_slice(&local.residual);
        }

        let mut jacobian = SparseMatrix::new(self.space.num_dofs());
        jacobian.par_extend(locals.into_par_iter().map(|local| local.jacobian));

        (jacobian, residual)
    }
}

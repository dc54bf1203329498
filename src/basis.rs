/// Gauss-Legendre quadrature rules
pub mod glq;

use crate::domain::{
    mesh::{
        p_refinement::PolyOrders,
        space::{Rect, V2D},
    },
    solution::FieldValue,
};

/// Legendre Polynomials (and their first derivatives) up to some order, sampled at a set of points on [-1, 1]
#[derive(Clone, Debug)]
pub struct LegendrePoly {
    /// `l[n][p]`: `P_n` at point `p`
    pub l: Vec<Vec<f64>>,
    /// `d1[n][p]`: `P_n'` at point `p`
    pub d1: Vec<Vec<f64>>,
}

impl LegendrePoly {
    pub fn with(max_n: u8, points: &[f64]) -> Self {
        let n = max_n as usize;
        let mut values: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
        let mut primes: Vec<Vec<f64>> = Vec::with_capacity(n + 1);

        for i in 0..=n {
            let (v, d) = match i {
                0 => (vec![1.0; points.len()], vec![0.0; points.len()]),
                1 => (Vec::from(points), vec![1.0; points.len()]),
                _ => {
                    let i_f = i as f64;
                    points
                        .iter()
                        .enumerate()
                        .map(|(p, x)| {
                            (
                                ((2.0 * i_f - 1.0) * x * values[i - 1][p]
                                    - (i_f - 1.0) * values[i - 2][p])
                                    / i_f,
                                i_f * values[i - 1][p] + x * primes[i - 1][p],
                            )
                        })
                        .unzip()
                }
            };
            values.push(v);
            primes.push(d);
        }

        Self {
            l: values,
            d1: primes,
        }
    }
}

/// The tensor-product Legendre basis of one leaf `Elem`, sampled on a grid of points in Real Space
///
/// Grid points are addressed by `[px, py]` (indices into the `xs` and `ys` used to build the sampler).
/// The points do not need to lie inside the `Elem`'s bounds.
#[derive(Clone, Debug)]
pub struct ElemBasis {
    orders: PolyOrders,
    u: LegendrePoly,
    v: LegendrePoly,
    scale: V2D,
}

impl ElemBasis {
    pub fn sample(orders: PolyOrders, bounds: &Rect, xs: &[f64], ys: &[f64]) -> Self {
        let us: Vec<f64> = xs
            .iter()
            .map(|x| 2.0 * (x - bounds.min.x) / bounds.width() - 1.0)
            .collect();
        let vs: Vec<f64> = ys
            .iter()
            .map(|y| 2.0 * (y - bounds.min.y) / bounds.height() - 1.0)
            .collect();

        Self {
            orders,
            u: LegendrePoly::with(orders.ni, &us),
            v: LegendrePoly::with(orders.nj, &vs),
            scale: bounds.local_scale(),
        }
    }

    pub fn orders(&self) -> PolyOrders {
        self.orders
    }

    pub fn num_fns(&self) -> usize {
        self.orders.num_basis_fns()
    }

    /// Value of `P_i(u) P_j(v)`
    pub fn value(&self, [i, j]: [u8; 2], [px, py]: [usize; 2]) -> f64 {
        self.u.l[i as usize][px] * self.v.l[j as usize][py]
    }

    /// Real Space gradient of `P_i(u) P_j(v)`
    pub fn gradient(&self, [i, j]: [u8; 2], [px, py]: [usize; 2]) -> V2D {
        let (i, j) = (i as usize, j as usize);
        V2D::from([
            self.u.d1[i][px] * self.v.l[j][py] * self.scale.x(),
            self.u.l[i][px] * self.v.d1[j][py] * self.scale.y(),
        ])
    }

    /// Evaluate the expansion with the given (local) coefficients on every grid point
    ///
    /// Points are ordered `px`-major: `px * ys.len() + py`
    pub fn field(&self, coefficients: &[f64]) -> Vec<FieldValue> {
        let nx = self.u.l.first().map_or(0, |l| l.len());
        let ny = self.v.l.first().map_or(0, |l| l.len());

        let mut field = vec![FieldValue::default(); nx * ny];
        for (ij, c) in self.orders.permutations().zip(coefficients.iter()) {
            if *c == 0.0 {
                continue;
            }
            for px in 0..nx {
                for py in 0..ny {
                    let f = &mut field[px * ny + py];
                    f.value += c * self.value(ij, [px, py]);
                    f.gradient = f.gradient + self.gradient(ij, [px, py]) * *c;
                }
            }
        }

        field
    }

    /// Diagonal of the (orthogonal) Legendre mass matrix over an `Elem`: `∫ (P_i P_j)^2 dA`
    pub fn mass_diagonal(orders: PolyOrders, bounds: &Rect) -> Vec<f64> {
        orders
            .permutations()
            .map(|[i, j]| {
                bounds.area() / ((2.0 * i as f64 + 1.0) * (2.0 * j as f64 + 1.0))
            })
            .collect()
    }
}

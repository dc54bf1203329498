use super::MAX_POLYNOMIAL_ORDER;
#[cfg(feature = "json_export")]
use json::{object, JsonValue};
use std::fmt;
use thiserror::Error;

/// Polynomial expansion orders of an Elem in the u and v directions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PolyOrders {
    /// Maximum u-directed polynomial expansion order
    pub ni: u8,
    /// Maximum v-directed polynomial expansion order
    pub nj: u8,
}

impl PolyOrders {
    pub const fn from(i: u8, j: u8) -> Self {
        Self { ni: i, nj: j }
    }

    pub const fn uniform(n: u8) -> Self {
        Self { ni: n, nj: n }
    }

    pub fn set(&mut self, [ni, nj]: [u8; 2]) -> Result<(), PRefError> {
        if ni > MAX_POLYNOMIAL_ORDER || nj > MAX_POLYNOMIAL_ORDER {
            return Err(PRefError::ExceededMaxExpansion);
        }
        if ni == 0 || nj == 0 {
            return Err(PRefError::NegExpansion);
        }

        self.ni = ni;
        self.nj = nj;

        Ok(())
    }

    /// Get the permutations of [i, j] for the tensor product basis: i ∈ [0, Ni] and j ∈ [0, Nj]
    ///
    /// The position of a pair in this sequence is its local DoF index on the Elem
    pub fn permutations(&self) -> impl Iterator<Item = [u8; 2]> + '_ {
        (0..=self.ni).flat_map(move |i_order| (0..=self.nj).map(move |j_order| [i_order, j_order]))
    }

    /// Number of basis functions supported by these orders
    pub fn num_basis_fns(&self) -> usize {
        (self.ni as usize + 1) * (self.nj as usize + 1)
    }

    /// Local DoF index of the basis function with orders [i, j]
    pub fn local_index(&self, [i, j]: [u8; 2]) -> usize {
        i as usize * (self.nj as usize + 1) + j as usize
    }

    /// Largest order in either direction
    pub fn max_order(&self) -> u8 {
        std::cmp::max(self.ni, self.nj)
    }
}

impl Default for PolyOrders {
    fn default() -> Self {
        Self { ni: 1, nj: 1 }
    }
}

impl fmt::Display for PolyOrders {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}, {}]", self.ni, self.nj)
    }
}

#[cfg(feature = "json_export")]
impl From<PolyOrders> for JsonValue {
    fn from(orders: PolyOrders) -> Self {
        object! {
            "u": orders.ni,
            "v": orders.nj,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PRefError {
    #[error("Expansion orders must be at least 1; Cannot p-Refine!")]
    NegExpansion,
    #[error("Expansion orders cannot exceed MAX_POLYNOMIAL_ORDER; Cannot p-Refine!")]
    ExceededMaxExpansion,
    #[error("Elem {0} does not exist; Cannot apply p-Refinement!")]
    ElemDoesntExist(usize),
    #[error("Multiple p-refinements were specified for Elem {0}; Cannot apply p-Refinements")]
    DoubleRefinement(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_and_basis_size() {
        let orders = PolyOrders::from(3, 2);
        assert_eq!(orders.num_basis_fns(), 12);
        assert_eq!(orders.permutations().count(), 12);
        assert_eq!(orders.max_order(), 3);
        assert_eq!(PolyOrders::uniform(2), PolyOrders::from(2, 2));
    }

    #[test]
    fn local_indices_follow_permutation_order() {
        let orders = PolyOrders::from(2, 1);
        for (idx, ij) in orders.permutations().enumerate() {
            assert_eq!(orders.local_index(ij), idx);
        }
    }

    #[test]
    fn set_rejects_zero_order() {
        let mut orders = PolyOrders::default();
        assert_eq!(orders.set([0, 2]), Err(PRefError::NegExpansion));
        assert_eq!(
            orders.set([MAX_POLYNOMIAL_ORDER + 1, 2]),
            Err(PRefError::ExceededMaxExpansion)
        );
        assert_eq!(orders, PolyOrders::default());
        orders.set([4, 2]).unwrap();
        assert_eq!(orders, PolyOrders::from(4, 2));
    }
}

use super::{mesh::space::{Point, V2D}, DiscreteSpace, SpaceId};
use crate::basis::ElemBasis;
use std::ops::Range;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SolutionError {
    #[error("Solution belongs to space {found}; Cannot read it on space {expected}!")]
    SpaceMismatch { expected: SpaceId, found: SpaceId },
    #[error("Space has {expected} DoFs but {found} coefficients were provided!")]
    LengthMismatch { expected: usize, found: usize },
}

/// Value and gradient of a scalar field at a point
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FieldValue {
    pub value: f64,
    pub gradient: V2D,
}

impl FieldValue {
    pub fn new(value: f64, gradient: V2D) -> Self {
        Self { value, gradient }
    }
}

/// A coefficient vector bound to exactly one [DiscreteSpace] (by its [SpaceId])
#[derive(Clone, Debug, PartialEq)]
pub struct Solution {
    space_id: SpaceId,
    coefficients: Vec<f64>,
}

impl Solution {
    pub fn new(space: &DiscreteSpace, coefficients: Vec<f64>) -> Result<Self, SolutionError> {
        if coefficients.len() != space.num_dofs() {
            Err(SolutionError::LengthMismatch {
                expected: space.num_dofs(),
                found: coefficients.len(),
            })
        } else {
            Ok(Self {
                space_id: space.id(),
                coefficients,
            })
        }
    }

    pub fn zero(space: &DiscreteSpace) -> Self {
        Self {
            space_id: space.id(),
            coefficients: vec![0.0; space.num_dofs()],
        }
    }

    pub fn space_id(&self) -> SpaceId {
        self.space_id
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn into_coefficients(self) -> Vec<f64> {
        self.coefficients
    }

    /// Pair this Solution with the space it was computed on
    pub fn bind<'a>(&'a self, space: &'a DiscreteSpace) -> Result<SolutionView<'a>, SolutionError> {
        if space.id() != self.space_id {
            Err(SolutionError::SpaceMismatch {
                expected: space.id(),
                found: self.space_id,
            })
        } else {
            Ok(SolutionView {
                space,
                solution: self,
            })
        }
    }
}

/// A [Solution] together with its [DiscreteSpace]; the only way to read a Solution's field
#[derive(Clone, Copy, Debug)]
pub struct SolutionView<'a> {
    space: &'a DiscreteSpace,
    solution: &'a Solution,
}

impl<'a> SolutionView<'a> {
    pub fn space(&self) -> &'a DiscreteSpace {
        self.space
    }

    pub fn solution(&self) -> &'a Solution {
        self.solution
    }

    /// Coefficients of a leaf `Elem`
    pub fn elem_coefficients(&self, elem_id: usize) -> Option<&'a [f64]> {
        let Range { start, end } = self.space.elem_dofs(elem_id)?;
        Some(&self.solution.coefficients[start..end])
    }

    /// Evaluate the field at a point (`None` outside the mesh)
    pub fn value_at(&self, point: &Point) -> Option<FieldValue> {
        let elem_id = self.space.mesh().locate(point)?;
        let elem = &self.space.mesh().elems[elem_id];
        let basis = ElemBasis::sample(elem.poly_orders, &elem.bounds, &[point.x], &[point.y]);
        basis
            .field(self.elem_coefficients(elem_id)?)
            .first()
            .copied()
    }
}

/// An owned ([DiscreteSpace], [Solution]) pair
#[derive(Clone, Debug)]
pub struct FieldState {
    space: DiscreteSpace,
    solution: Solution,
}

impl FieldState {
    pub fn new(space: DiscreteSpace, solution: Solution) -> Result<Self, SolutionError> {
        solution.bind(&space)?;
        Ok(Self { space, solution })
    }

    pub fn from_coefficients(
        space: DiscreteSpace,
        coefficients: Vec<f64>,
    ) -> Result<Self, SolutionError> {
        let solution = Solution::new(&space, coefficients)?;
        Ok(Self { space, solution })
    }

    pub fn space(&self) -> &DiscreteSpace {
        &self.space
    }

    pub fn solution(&self) -> &Solution {
        &self.solution
    }

    pub fn view(&self) -> SolutionView<'_> {
        SolutionView {
            space: &self.space,
            solution: &self.solution,
        }
    }

    pub fn into_parts(self) -> (DiscreteSpace, Solution) {
        (self.space, self.solution)
    }
}

#[cfg(test)]
mod tests {
    use super::super::mesh::{space::Rect, Mesh};
    use super::*;

    fn space(order: u8) -> DiscreteSpace {
        DiscreteSpace::with_uniform_order(
            Mesh::rectangle(Rect::new(Point::new(0.0, 0.0), Point::new(2.0, 1.0)), [2, 1]),
            order,
        )
        .unwrap()
    }

    #[test]
    fn solutions_are_bound_to_one_space() {
        let a = space(1);
        let b = space(1);
        let sol = Solution::new(&a, vec![0.0; 8]).unwrap();

        assert!(sol.bind(&a).is_ok());
        assert_eq!(
            sol.bind(&b).unwrap_err(),
            SolutionError::SpaceMismatch {
                expected: b.id(),
                found: a.id()
            }
        );
        assert_eq!(
            Solution::new(&a, vec![0.0; 3]).unwrap_err(),
            SolutionError::LengthMismatch {
                expected: 8,
                found: 3
            }
        );
    }

    #[test]
    fn point_evaluation() {
        let space = space(1);
        // u(x, y) = x on both elements: element 0 spans [0, 1] (x = 0.5 + 0.5 u), element 1 spans [1, 2]
        let state =
            FieldState::from_coefficients(space, vec![0.5, 0.0, 0.5, 0.0, 1.5, 0.0, 0.5, 0.0])
                .unwrap();
        let view = state.view();

        for x in [0.1, 0.7, 1.3, 1.9] {
            let fv = view.value_at(&Point::new(x, 0.4)).unwrap();
            assert!((fv.value - x).abs() < 1e-14);
            assert!((fv.gradient.x() - 1.0).abs() < 1e-14);
            assert!(fv.gradient.y().abs() < 1e-14);
        }

        assert!(view.value_at(&Point::new(2.5, 0.5)).is_none());
        assert_eq!(view.elem_coefficients(1), Some(&[1.5, 0.0, 0.5, 0.0][..]));
    }
}

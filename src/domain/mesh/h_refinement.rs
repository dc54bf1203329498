use super::space::{ParaDir, Point, Rect};
use thiserror::Error;

/// Description of an h-Refinement
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HRef {
    /// isotropic (4 children)
    T,
    /// anisotropic about the u-direction (2 children side by side)
    U,
    /// anisotropic about the v-direction (2 children stacked on top of one another)
    V,
}

impl HRef {
    pub fn num_children(&self) -> usize {
        match self {
            Self::T => 4,
            Self::U | Self::V => 2,
        }
    }

    /// Is an Elem's extent along `dir` halved by this refinement
    pub fn splits(&self, dir: ParaDir) -> bool {
        matches!(
            (self, dir),
            (Self::T, _) | (Self::U, ParaDir::U) | (Self::V, ParaDir::V)
        )
    }

    /// Location of the child with index `idx` relative to its parent
    pub fn loc(&self, idx: usize) -> HRefLoc {
        match self {
            Self::T => HRefLoc::T(match idx {
                0 => Quadrant::SW,
                1 => Quadrant::SE,
                2 => Quadrant::NW,
                3 => Quadrant::NE,
                _ => panic!("T-Type h-Refinements only produce 4 children; index {} is invalid!", idx),
            }),
            Self::U => HRefLoc::U(Bisection::from_index(idx)),
            Self::V => HRefLoc::V(Bisection::from_index(idx)),
        }
    }

    /// Child indices paired with new Elem ids (drawn from the `id_counter`)
    pub fn indices_and_ids(&self, id_counter: &mut usize) -> impl Iterator<Item = (usize, usize)> {
        let first_id = *id_counter;
        let n = self.num_children();
        *id_counter += n;

        (0..n).map(move |idx| (idx, first_id + idx))
    }
}

/// Quadrant of a child Elem following a T-Type h-Refinement (from the parent Elem's perspective)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quadrant {
    /// south west
    SW,
    /// south east
    SE,
    /// north west
    NW,
    /// north east
    NE,
}

impl Quadrant {
    pub fn index(&self) -> usize {
        match self {
            Self::SW => 0,
            Self::SE => 1,
            Self::NW => 2,
            Self::NE => 3,
        }
    }
}

/// Location of a child Elem following a U-Type or V-Type h-refinement (from the parent Elem's perspective).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bisection {
    /// Bottom (V-type) or Left (U-type)
    BL,
    /// Top (V-Type) or Right (U-type)
    TR,
}

impl Bisection {
    fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::BL,
            1 => Self::TR,
            _ => panic!("U/V-Type h-Refinements only produce 2 children; index {} is invalid!", idx),
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Self::BL => 0,
            Self::TR => 1,
        }
    }
}

/// The location of an Elem relative to its parent following an h-refinement
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HRefLoc {
    T(Quadrant),
    U(Bisection),
    V(Bisection),
}

impl HRefLoc {
    pub fn index(&self) -> usize {
        match self {
            Self::T(quad) => quad.index(),
            Self::U(bi) | Self::V(bi) => bi.index(),
        }
    }

    /// The region of the parent's bounds covered by a child at this location
    pub fn sub_rect(&self, parent: &Rect) -> Rect {
        let mid = parent.center();
        let [u_half, v_half] = match self {
            Self::T(Quadrant::SW) => [Some(false), Some(false)],
            Self::T(Quadrant::SE) => [Some(true), Some(false)],
            Self::T(Quadrant::NW) => [Some(false), Some(true)],
            Self::T(Quadrant::NE) => [Some(true), Some(true)],
            Self::U(bi) => [Some(*bi == Bisection::TR), None],
            Self::V(bi) => [None, Some(*bi == Bisection::TR)],
        };

        let [x_min, x_max] = match u_half {
            None => [parent.min.x, parent.max.x],
            Some(false) => [parent.min.x, mid.x],
            Some(true) => [mid.x, parent.max.x],
        };
        let [y_min, y_max] = match v_half {
            None => [parent.min.y, parent.max.y],
            Some(false) => [parent.min.y, mid.y],
            Some(true) => [mid.y, parent.max.y],
        };

        Rect::new(Point::new(x_min, y_min), Point::new(x_max, y_max))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HRefError {
    #[error("Elem {0} already has children; Cannot apply h-Refinement!")]
    ElemHasChildren(usize),
    #[error("Elem {0} does not exist; Cannot apply h-Refinement!")]
    ElemDoesntExist(usize),
    #[error("Multiple h-Refinements were specified for Elem {0}; Cannot apply h-Refinements!")]
    DoubleRefinement(usize),
    #[error("Elem {0} is too small to be h-Refined further!")]
    MinEdgeLength(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_regions() {
        let parent = Rect::new(Point::new(0.0, 0.0), Point::new(2.0, 1.0));

        let ne = HRefLoc::T(Quadrant::NE).sub_rect(&parent);
        assert_eq!(ne.min, Point::new(1.0, 0.5));
        assert_eq!(ne.max, Point::new(2.0, 1.0));

        let right = HRef::U.loc(1).sub_rect(&parent);
        assert_eq!(right.min, Point::new(1.0, 0.0));
        assert_eq!(right.max, Point::new(2.0, 1.0));

        let bottom = HRef::V.loc(0).sub_rect(&parent);
        assert_eq!(bottom.max, Point::new(2.0, 0.5));
    }

    #[test]
    fn child_ids_are_sequential() {
        let mut counter = 7;
        let pairs: Vec<_> = HRef::T.indices_and_ids(&mut counter).collect();

        assert_eq!(pairs, vec![(0, 7), (1, 8), (2, 9), (3, 10)]);
        assert_eq!(counter, 11);
    }
}

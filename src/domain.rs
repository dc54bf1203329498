/// The internal geometric structure of a Domain
pub mod mesh;
/// Coefficient vectors bound to a [DiscreteSpace]
pub mod solution;

use mesh::{
    elem::Elem,
    h_refinement::{HRef, HRefError},
    p_refinement::{PRefError, PolyOrders},
    Mesh,
};

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

static NEXT_SPACE_ID: AtomicU64 = AtomicU64::new(0);

/// Identity of a DoF layout
///
/// Every [DiscreteSpace] mutation that changes its layout produces a new `SpaceId`. Clones share the id of their source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpaceId(u64);

impl SpaceId {
    fn fresh() -> Self {
        Self(NEXT_SPACE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SpaceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A change to a single leaf `Elem` of a [DiscreteSpace]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Refinement {
    /// Replace the expansion orders of the Elem
    P(PolyOrders),
    /// Split the Elem, giving each child the specified expansion orders
    H(HRef, PolyOrders),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpaceError {
    #[error(transparent)]
    HRef(#[from] HRefError),
    #[error(transparent)]
    PRef(#[from] PRefError),
    #[error("Elem {0} is not a leaf of the Mesh; Cannot refine it!")]
    NotALeaf(usize),
    #[error("Elem {0} is not covered by a leaf of the source Mesh; Cannot duplicate expansion orders!")]
    IncompatibleMesh(usize),
}

/// A discontinuous, tensor-product Legendre space over the leaves of a [Mesh]
///
/// Each leaf `Elem` with expansion orders `[ni, nj]` carries `(ni + 1) * (nj + 1)` DoFs.
/// DoFs are numbered contiguously, leaf by leaf, in ascending order of `Elem` id.
/// Within a leaf, the basis function `P_i(u) P_j(v)` has the local index `i * (nj + 1) + j`.
#[derive(Debug, Clone)]
pub struct DiscreteSpace {
    id: SpaceId,
    mesh: Mesh,
    dof_ranges: Vec<Option<Range<usize>>>,
    num_dofs: usize,
}

impl DiscreteSpace {
    /// Build a space using the expansion orders already stored on the `Mesh`
    pub fn from_mesh(mesh: Mesh) -> Self {
        let mut space = Self {
            id: SpaceId::fresh(),
            mesh,
            dof_ranges: Vec::new(),
            num_dofs: 0,
        };

        space.gen_dofs();
        space
    }

    /// Build a space with the same expansion order on every `Elem`
    pub fn with_uniform_order(mut mesh: Mesh, order: u8) -> Result<Self, SpaceError> {
        mesh.set_global_expansion_orders([order, order])?;
        Ok(Self::from_mesh(mesh))
    }

    fn gen_dofs(&mut self) {
        self.dof_ranges = vec![None; self.mesh.elems.len()];

        let mut next_dof = 0;
        for elem in self.mesh.leaf_elems() {
            let n = elem.poly_orders.num_basis_fns();
            self.dof_ranges[elem.id] = Some(next_dof..next_dof + n);
            next_dof += n;
        }

        self.num_dofs = next_dof;
    }

    fn layout_changed(&mut self) {
        self.id = SpaceId::fresh();
        self.gen_dofs();
    }

    pub fn id(&self) -> SpaceId {
        self.id
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn num_dofs(&self) -> usize {
        self.num_dofs
    }

    /// The global DoF indices of a leaf `Elem` (`None` for non-leaf or unknown `Elem`s)
    pub fn elem_dofs(&self, elem_id: usize) -> Option<Range<usize>> {
        self.dof_ranges.get(elem_id).cloned().flatten()
    }

    /// Iterate over the leaf `Elem`s and their DoF ranges in DoF order
    pub fn leaves(&self) -> impl Iterator<Item = (&Elem, Range<usize>)> + '_ {
        self.mesh
            .leaf_elems()
            .filter_map(move |elem| self.elem_dofs(elem.id).map(|dofs| (elem, dofs)))
    }

    /// Set every `Elem` to the same expansion order
    pub fn set_uniform_order(&mut self, order: u8) -> Result<(), SpaceError> {
        self.mesh.set_global_expansion_orders([order, order])?;
        self.layout_changed();
        Ok(())
    }

    /// Build a space over `new_mesh` (a refinement of this space's mesh) where every leaf takes the expansion orders
    /// of the leaf of this space that covers it, increased by `order_increase`
    pub fn duplicate_with_order_increase(
        &self,
        mut new_mesh: Mesh,
        order_increase: u8,
    ) -> Result<Self, SpaceError> {
        let orders = new_mesh
            .leaf_elems()
            .map(|elem| {
                let source_id = self
                    .mesh
                    .locate(&elem.bounds.center())
                    .ok_or(SpaceError::IncompatibleMesh(elem.id))?;
                let source = self.mesh.elems[source_id].poly_orders;

                Ok((
                    elem.id,
                    [
                        source.ni.saturating_add(order_increase),
                        source.nj.saturating_add(order_increase),
                    ],
                ))
            })
            .collect::<Result<Vec<_>, SpaceError>>()?;

        new_mesh.set_expansion_orders(orders)?;
        Ok(Self::from_mesh(new_mesh))
    }

    /// The reference space: every leaf split isotropically, every expansion order increased by `order_increase`
    pub fn reference_space(&self, order_increase: u8) -> Result<Self, SpaceError> {
        let mut ref_mesh = self.mesh.clone();
        ref_mesh.global_h_refinement(HRef::T)?;
        self.duplicate_with_order_increase(ref_mesh, order_increase)
    }

    /// Apply a set of [Refinement]s to leaf `Elem`s
    ///
    /// Nothing is modified if any of the refinements are invalid. The space receives a new id when anything changes.
    pub fn apply_refinements(
        &mut self,
        refinements: Vec<(usize, Refinement)>,
    ) -> Result<(), SpaceError> {
        if refinements.is_empty() {
            return Ok(());
        }

        let mut h_refinements = Vec::new();
        let mut child_orders = BTreeMap::new();
        let mut p_orders = Vec::new();

        for (elem_id, refinement) in refinements {
            match self.mesh.elems.get(elem_id) {
                None => return Err(HRefError::ElemDoesntExist(elem_id).into()),
                Some(elem) if elem.has_children() => return Err(SpaceError::NotALeaf(elem_id)),
                Some(_) => (),
            }

            match refinement {
                Refinement::P(orders) => {
                    check_orders(orders)?;
                    p_orders.push((elem_id, [orders.ni, orders.nj]));
                }
                Refinement::H(h_ref, orders) => {
                    check_orders(orders)?;
                    h_refinements.push((elem_id, h_ref));
                    child_orders.insert(elem_id, orders);
                }
            }
        }

        if let Some((elem_id, _)) = p_orders
            .iter()
            .find(|(elem_id, _)| child_orders.contains_key(elem_id))
        {
            return Err(SpaceError::HRef(HRefError::DoubleRefinement(*elem_id)));
        }

        // validated in full before anything is applied
        let mut trial_mesh = self.mesh.clone();
        trial_mesh.execute_h_refinements(h_refinements)?;

        for (parent_id, orders) in child_orders {
            if let Some(child_ids) = trial_mesh.elems[parent_id].child_ids() {
                p_orders.extend(child_ids.iter().map(|id| (*id, [orders.ni, orders.nj])));
            }
        }
        trial_mesh.set_expansion_orders(p_orders)?;

        self.mesh = trial_mesh;
        self.layout_changed();
        Ok(())
    }
}

fn check_orders(orders: PolyOrders) -> Result<(), PRefError> {
    PolyOrders::default().set([orders.ni, orders.nj])
}

#[cfg(test)]
mod tests {
    use super::mesh::space::{Point, Rect};
    use super::*;

    fn square_mesh(n: usize) -> Mesh {
        Mesh::rectangle(
            Rect::new(Point::new(0.0, 0.0), Point::new(1.0, 1.0)),
            [n, n],
        )
    }

    #[test]
    fn dof_numbering() {
        let mut mesh = square_mesh(2);
        mesh.set_expansion_orders(vec![(0, [1, 1]), (1, [2, 1]), (2, [1, 3]), (3, [2, 2])])
            .unwrap();
        let space = DiscreteSpace::from_mesh(mesh);

        assert_eq!(space.num_dofs(), 4 + 6 + 8 + 9);
        assert_eq!(space.elem_dofs(0), Some(0..4));
        assert_eq!(space.elem_dofs(1), Some(4..10));
        assert_eq!(space.elem_dofs(3), Some(18..27));
        assert_eq!(space.elem_dofs(4), None);
        assert_eq!(space.leaves().count(), 4);
    }

    #[test]
    fn layout_changes_produce_new_ids() {
        let mut space = DiscreteSpace::with_uniform_order(square_mesh(1), 2).unwrap();
        let first = space.id();

        assert_eq!(space.clone().id(), first);

        space.set_uniform_order(3).unwrap();
        let second = space.id();
        assert_ne!(first, second);
        assert_eq!(space.num_dofs(), 16);

        space
            .apply_refinements(vec![(0, Refinement::H(HRef::T, PolyOrders::uniform(2)))])
            .unwrap();
        assert_ne!(space.id(), second);
        assert_eq!(space.num_dofs(), 4 * 9);
    }

    #[test]
    fn reference_space_is_richer() {
        let mut mesh = square_mesh(2);
        mesh.set_expansion_orders(vec![(0, [1, 1]), (1, [2, 1]), (2, [1, 3]), (3, [2, 2])])
            .unwrap();
        let coarse = DiscreteSpace::from_mesh(mesh);
        let reference = coarse.reference_space(1).unwrap();

        assert_eq!(reference.mesh().num_leaves(), 16);
        assert_eq!(reference.num_dofs(), 4 * (9 + 12 + 15 + 16));
        assert!(reference.num_dofs() > coarse.num_dofs());
        assert_ne!(reference.id(), coarse.id());

        for elem in reference.mesh().leaf_elems() {
            let parent = &coarse.mesh().elems[elem.parent_id().unwrap()];
            assert_eq!(elem.poly_orders.ni, parent.poly_orders.ni + 1);
            assert_eq!(elem.poly_orders.nj, parent.poly_orders.nj + 1);
        }
    }

    #[test]
    fn mixed_refinements() {
        let mut space = DiscreteSpace::with_uniform_order(square_mesh(2), 2).unwrap();
        space
            .apply_refinements(vec![
                (0, Refinement::P(PolyOrders::from(3, 2))),
                (1, Refinement::H(HRef::U, PolyOrders::from(2, 3))),
                (3, Refinement::H(HRef::V, PolyOrders::uniform(1))),
            ])
            .unwrap();

        assert_eq!(space.mesh().num_leaves(), 6);
        assert_eq!(space.num_dofs(), 12 + 2 * 12 + 9 + 2 * 4);
        assert_eq!(space.mesh().elems[4].poly_orders, PolyOrders::from(2, 3));
    }

    #[test]
    fn invalid_refinements_change_nothing() {
        let mut space = DiscreteSpace::with_uniform_order(square_mesh(2), 2).unwrap();
        let id = space.id();

        let result = space.apply_refinements(vec![
            (0, Refinement::H(HRef::T, PolyOrders::uniform(2))),
            (1, Refinement::P(PolyOrders::from(0, 2))),
        ]);
        assert_eq!(result, Err(SpaceError::PRef(PRefError::NegExpansion)));

        let result = space.apply_refinements(vec![
            (0, Refinement::H(HRef::T, PolyOrders::uniform(2))),
            (0, Refinement::P(PolyOrders::uniform(3))),
        ]);
        assert_eq!(result, Err(SpaceError::HRef(HRefError::DoubleRefinement(0))));

        assert_eq!(space.id(), id);
        assert_eq!(space.mesh().elems.len(), 4);

        space
            .apply_refinements(vec![(0, Refinement::H(HRef::T, PolyOrders::uniform(2)))])
            .unwrap();
        assert_eq!(
            space.apply_refinements(vec![(0, Refinement::P(PolyOrders::uniform(3)))]),
            Err(SpaceError::NotALeaf(0))
        );
    }
}

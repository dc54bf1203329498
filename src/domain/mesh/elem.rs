use super::{
    element::Element,
    h_refinement::{HRef, HRefError, HRefLoc},
    p_refinement::PolyOrders,
    space::Rect,
    EXPECTED_NUM_H_REFINEMENTS,
};
#[cfg(feature = "json_export")]
use json::{array, object, JsonValue};
use smallvec::SmallVec;
use std::sync::Arc;

/// `Elem`s are the basic geometric unit in the `Mesh`
///
/// `Elem`s are responsible for keeping track of:
/// * Connections to their parent `Elem` (and their own h-refinement state)
/// * Connections to their child `Elem`s (if h-refined)
/// * Polynomial expansion orders (p-refinement state)
///
/// `Elem`s also maintain a connection to their associated [`Element`] (the base cell of the mesh they were refined from)
///
/// ## Layout
/// The sides of an `Elem` are indexed as follows:
///
/// ```text
///               N
///         2 --------- 3
///         |     1     |
///         |           |
///      W  |2         3|  E
///         |           |
///         |     0     |
///         0 --------- 1
///               S
/// ```
///
/// ## h-Refinement
///
/// Three variants of h-refinements are supported. The relative indices of the child `Elem`s are shown below for each type:
///
/// ```text
///        T-Type                U-Type                V-Type
///  -------------------   -------------------   -------------------
///  |   2    |    3   |   |        |        |   |        1        |
///  |--------|--------|   |   0    |    1   |   |-----------------|
///  |   0    |    1   |   |        |        |   |        0        |
///  -------------------   -------------------   -------------------
/// ```
#[derive(Debug, Clone)]
pub struct Elem {
    pub id: usize,
    pub element: Arc<Element>,
    pub bounds: Rect,
    pub poly_orders: PolyOrders,
    children: Option<SmallVec<[usize; 4]>>,
    refinement: Option<HRef>,
    ancestors: SmallVec<[(usize, HRefLoc); EXPECTED_NUM_H_REFINEMENTS]>,
}

impl Elem {
    /// Construct a new base-layer Elem covering an [`Element`]
    pub fn new(id: usize, element: Arc<Element>) -> Self {
        Self {
            id,
            bounds: element.bounds(),
            element,
            children: None,
            refinement: None,
            ancestors: SmallVec::new(),
            poly_orders: PolyOrders::default(),
        }
    }

    /// Construct 2 or 4 child Elems from an [HRef] of this Elem
    ///
    /// Children inherit this Elem's polynomial expansion orders
    pub(crate) fn h_refine(
        &mut self,
        refinement: HRef,
        id_counter: &mut usize,
    ) -> Result<Vec<Elem>, HRefError> {
        match self.children {
            Some(_) => Err(HRefError::ElemHasChildren(self.id)),
            None => {
                let children = refinement
                    .indices_and_ids(id_counter)
                    .map(|(idx, id)| self.new_child(id, refinement.loc(idx)))
                    .collect::<Vec<Elem>>();

                self.children = Some(children.iter().map(|ce| ce.id).collect());
                self.refinement = Some(refinement);
                Ok(children)
            }
        }
    }

    fn new_child(&self, id: usize, loc: HRefLoc) -> Self {
        let mut ancestors = self.ancestors.clone();
        ancestors.push((self.id, loc));

        Self {
            id,
            element: self.element.clone(),
            bounds: loc.sub_rect(&self.bounds),
            poly_orders: self.poly_orders,
            children: None,
            refinement: None,
            ancestors,
        }
    }

    /// Id of the Parent Elem if this Elem has a parent
    pub fn parent_id(&self) -> Option<usize> {
        self.ancestors.last().map(|(id, _)| *id)
    }

    /// Returns a vector of ids for this Elem's children. Returns `None` if this Elem has no children.
    pub fn child_ids(&self) -> Option<SmallVec<[usize; 4]>> {
        self.children.clone()
    }

    /// Has this `Elem` been h-Refined
    pub fn has_children(&self) -> bool {
        self.children.is_some()
    }

    /// The h-Refinement that produced this Elem's children
    pub fn refinement(&self) -> Option<HRef> {
        self.refinement
    }

    /// Produce a Json Object that describes this Elem
    #[cfg(feature = "json_export")]
    pub fn to_json(&self) -> JsonValue {
        object! {
            "id": self.id,
            "element_id": self.element.id,
            "parent": self.parent_id(),
            "active": self.children.is_none(),
            "min": array![self.bounds.min.x, self.bounds.min.y],
            "max": array![self.bounds.max.x, self.bounds.max.y],
            "expansion": self.poly_orders,
            "children": JsonValue::from(
                match &self.children {
                    Some(ids) => ids.to_vec(),
                    None => Vec::new(),
                }
            )
        }
    }
}

/// A Finite Element in Parametric Space (the nodes of the refinement tree)
pub mod elem;
/// A Finite Element in Real Space
pub mod element;
/// Structures and Functions to facilitate anisotropic h-refinement
pub mod h_refinement;
/// Structures and Functions to facilitate anisotropic p-refinement
pub mod p_refinement;
/// Structures to describe the 2D real and parametric spaces defining a Mesh
pub mod space;

use elem::Elem;
use element::Element;
use h_refinement::{HRef, HRefError};
use p_refinement::PRefError;
use space::{Point, Rect, Side};

#[cfg(feature = "json_export")]
use json::object;
use json::JsonValue;
use std::collections::BTreeMap;
use std::fs::read_to_string;
#[cfg(feature = "json_export")]
use std::{fs::File, io::BufWriter};
use std::sync::Arc;
use thiserror::Error;

/// Minimum Edge length in Real Space. h-Refinements will fail after edges are smaller than this value.
pub const MIN_EDGE_LENGTH: f64 = 3.0518e-5; // 15ish refinement layers with unit sized cells

/// The expected "h-Refinement" depth. This determines the stack allocation size of some `SmallVec`s related to h-Refinement
pub const EXPECTED_NUM_H_REFINEMENTS: usize = 8;

/// Maximum Polynomial expansion. p-Refinements will fail when Elem's expansion orders exceed this value.
pub const MAX_POLYNOMIAL_ORDER: u8 = 20;

/// Thickness of the strips used to find the neighbors of a region
const NEIGHBOR_STRIP_THICKNESS: f64 = MIN_EDGE_LENGTH * 1e-3;

/// Limit on the difference in refinement depth between adjacent leaf `Elem`s
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshRegularity {
    /// Arbitrary-level hanging nodes are allowed
    Unconstrained,
    /// Adjacent leaves can differ by at most `n` levels of h-refinement across a shared side
    MaxHangingLevel(u8),
}

impl MeshRegularity {
    /// Does this bound permit a hanging level of `level`
    pub fn admits(&self, level: u8) -> bool {
        match self {
            Self::Unconstrained => true,
            Self::MaxHangingLevel(max) => level <= *max,
        }
    }
}

impl Default for MeshRegularity {
    fn default() -> Self {
        Self::Unconstrained
    }
}

#[derive(Debug, Error)]
pub enum MeshFileError {
    #[error("Unable to read Mesh file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unable to parse Mesh file as JSON: {0}")]
    Json(#[from] json::Error),
    #[error("Mesh file must contain an Array of {0}!")]
    MissingArray(&'static str),
    #[error("Element {0} must have an Array of 4 unique node_ids smaller than the number of Nodes!")]
    BadNodeIds(usize),
    #[error("Node {0} must be an Array of 2 numerical values!")]
    BadNode(usize),
    #[error("All Nodes must be at unique locations; Node {0} is duplicated!")]
    DuplicateNode(usize),
    #[error("Element {0} must be an axis aligned rectangle with nodes ordered [SW, SE, NW, NE]!")]
    NotAxisAligned(usize),
    #[error("Elements {0} and {1} overlap!")]
    Overlap(usize, usize),
}

/// Information used to Define the geometric structure and refinement state of a Domain.
///
/// `Elem`s are stored in an arena. Their ids are stable handles: refinements only ever append new `Elem`s.
/// The first `elements.len()` `Elem`s are the base layer of the Mesh (one per [`Element`]).
#[derive(Debug, Clone)]
pub struct Mesh {
    pub elements: Vec<Arc<Element>>,
    pub elems: Vec<Elem>,
}

impl Mesh {
    /// Construct a structured Mesh of `nx` by `ny` equally sized Elements covering `bounds`
    ///
    /// Elements are numbered row by row, starting in the SW corner
    pub fn rectangle(bounds: Rect, [nx, ny]: [usize; 2]) -> Self {
        let dx = bounds.width() / nx as f64;
        let dy = bounds.height() / ny as f64;

        let elements = (0..ny)
            .flat_map(|j| (0..nx).map(move |i| (i, j)))
            .enumerate()
            .map(|(id, (i, j))| {
                let x = [i, i + 1].map(|k| bounds.min.x + dx * k as f64);
                let y = [j, j + 1].map(|k| bounds.min.y + dy * k as f64);
                Element::new(
                    id,
                    [
                        Point::new(x[0], y[0]),
                        Point::new(x[1], y[0]),
                        Point::new(x[0], y[1]),
                        Point::new(x[1], y[1]),
                    ],
                )
            })
            .collect();

        Self::from_elements(elements)
    }

    fn from_elements(elements: Vec<Element>) -> Self {
        let elements: Vec<Arc<Element>> = elements.into_iter().map(Arc::new).collect();
        let elems = elements
            .iter()
            .map(|element| Elem::new(element.id, element.clone()))
            .collect();

        Self { elements, elems }
    }

    /// Construct a Mesh from a JSON file with the following format
    ///
    /// Node ids are listed in the order `[SW, SE, NW, NE]`. This file describes a two element mesh:
    /// ```text
    ///     3               4               5
    /// 1.0 *---------------*---------------*
    ///     |               |               |
    ///     |       0       |       1       |
    ///     |               |               |
    /// 0.0 *---------------*---------------*
    ///  y  0               1               2
    ///  x 0.0             1.0             2.0
    /// ```
    ///
    /// mesh.json
    /// ```JSON
    /// {
    ///     "Elements": [
    ///         {
    ///             "node_ids": [0, 1, 3, 4],
    ///         },
    ///         {
    ///             "node_ids": [1, 2, 4, 5],
    ///         }
    ///     ],
    ///     "Nodes": [
    ///         [0.0, 0.0],
    ///         [1.0, 0.0],
    ///         [2.0, 0.0],
    ///         [0.0, 1.0],
    ///         [1.0, 1.0],
    ///         [2.0, 1.0],
    ///     ]
    /// }
    /// ```
    pub fn from_file(path: impl AsRef<str>) -> Result<Self, MeshFileError> {
        let mesh_file_contents = read_to_string(path.as_ref())?;
        let mesh_file_json = json::parse(&mesh_file_contents)?;
        Self::from_json(&mesh_file_json)
    }

    /// Construct a Mesh from a parsed JSON mesh description (see [`Mesh::from_file`])
    pub fn from_json(mesh_json: &JsonValue) -> Result<Self, MeshFileError> {
        let points = parse_node_information(mesh_json)?;
        let element_node_ids = parse_element_information(mesh_json, points.len())?;

        let elements: Vec<Element> = element_node_ids
            .iter()
            .enumerate()
            .map(|(element_id, node_ids)| {
                let element = Element::new(element_id, node_ids.map(|node_id| points[node_id]));
                if is_axis_aligned(&element.points) {
                    Ok(element)
                } else {
                    Err(MeshFileError::NotAxisAligned(element_id))
                }
            })
            .collect::<Result<_, _>>()?;

        for (i, element) in elements.iter().enumerate() {
            for other in elements.iter().skip(i + 1) {
                if element.bounds().intersection(&other.bounds()).is_some() {
                    return Err(MeshFileError::Overlap(element.id, other.id));
                }
            }
        }

        Ok(Self::from_elements(elements))
    }

    /// Print the mesh to a JSON file specified by path.
    #[cfg(feature = "json_export")]
    pub fn export_to_json(&self, path: impl AsRef<str>) -> std::io::Result<()> {
        let f = File::create(path.as_ref())?;
        let mut w = BufWriter::new(&f);

        self.to_json().write_pretty(&mut w, 4)?;

        Ok(())
    }

    /// Produce a Json Object that describes the Elements and Elems of this Mesh
    #[cfg(feature = "json_export")]
    pub fn to_json(&self) -> JsonValue {
        object! {
            "Elements": JsonValue::from(self.elements.iter().map(|element| element.to_json()).collect::<Vec<_>>()),
            "Elems": JsonValue::from(self.elems.iter().map(|elem| elem.to_json()).collect::<Vec<_>>()),
        }
    }

    // ----------------------------------------------------------------------------------------------------
    // General Data Retrieval
    // ----------------------------------------------------------------------------------------------------

    /// Iterate over the `Elem`s without children in order of their ids
    pub fn leaf_elems(&self) -> impl Iterator<Item = &Elem> + '_ {
        self.elems.iter().filter(|elem| !elem.has_children())
    }

    /// Ids of the `Elem`s without children in ascending order
    pub fn leaf_ids(&self) -> Vec<usize> {
        self.leaf_elems().map(|elem| elem.id).collect()
    }

    pub fn num_leaves(&self) -> usize {
        self.leaf_elems().count()
    }

    /// Find the leaf `Elem` containing a point
    ///
    /// Points on a shared boundary resolve to the leaf with the smallest base Element (then child index)
    pub fn locate(&self, point: &Point) -> Option<usize> {
        let mut elem_id = self
            .elems
            .iter()
            .take(self.elements.len())
            .find(|elem| elem.bounds.contains(point))?
            .id;

        while let Some(child_ids) = self.elems[elem_id].child_ids() {
            elem_id = child_ids
                .into_iter()
                .find(|child_id| self.elems[*child_id].bounds.contains(point))?;
        }

        Some(elem_id)
    }

    /// Ids of all leaf `Elem`s whose intersection with `region` has a positive area (in ascending order)
    pub fn leaves_overlapping(&self, region: &Rect) -> Vec<usize> {
        let mut leaves = Vec::new();
        for base_elem in self.elems.iter().take(self.elements.len()) {
            self.rec_leaves_overlapping(base_elem.id, region, &mut leaves);
        }
        leaves.sort_unstable();
        leaves
    }

    fn rec_leaves_overlapping(&self, elem_id: usize, region: &Rect, leaves: &mut Vec<usize>) {
        let elem = &self.elems[elem_id];
        if elem.bounds.intersection(region).is_some() {
            match elem.child_ids() {
                Some(child_ids) => {
                    for child_id in child_ids {
                        self.rec_leaves_overlapping(child_id, region, leaves);
                    }
                }
                None => leaves.push(elem_id),
            }
        }
    }

    /// Leaf `Elem`s sharing some portion of a side of `region`
    pub fn neighbors_across(&self, region: &Rect, side: Side) -> Vec<usize> {
        self.leaves_overlapping(&region.outer_strip(side, NEIGHBOR_STRIP_THICKNESS))
    }

    /// The largest difference in h-refinement depth between `region` and the leaves across its sides
    ///
    /// Leaves in `ignore` are skipped (used to evaluate prospective children of an `Elem` before it is refined).
    pub fn hanging_level(&self, region: &Rect, ignore: &[usize]) -> u8 {
        Side::ALL
            .iter()
            .flat_map(|side| {
                self.neighbors_across(region, *side)
                    .into_iter()
                    .filter(|id| !ignore.contains(id))
                    .map(move |id| {
                        let dir = side.dir();
                        let ratio = self.elems[id].bounds.extent(dir) / region.extent(dir);
                        ratio.log2().round().abs() as u8
                    })
            })
            .max()
            .unwrap_or(0)
    }

    /// Determine if this Elem can be h-refined
    /// * returns false if the Elem already has children
    /// * returns false if the split edges of the Elem are shorter than [MIN_EDGE_LENGTH]
    /// * returns an `Err` if the Mesh doesn't have `elem_id`
    pub fn elem_is_h_refineable(&self, elem_id: usize, refinement: HRef) -> Result<bool, HRefError> {
        if elem_id >= self.elems.len() {
            Err(HRefError::ElemDoesntExist(elem_id))
        } else {
            let elem = &self.elems[elem_id];
            Ok(!elem.has_children() && !violates_min_edge_length(&elem.bounds, refinement))
        }
    }

    // ----------------------------------------------------------------------------------------------------
    // h-refinement methods
    // ----------------------------------------------------------------------------------------------------

    /// Apply an [HRef] to every leaf [Elem] in the Mesh
    ///
    /// Fails without modifying the Mesh if any leaf is too small to be refined
    pub fn global_h_refinement(&mut self, refinement: HRef) -> Result<(), HRefError> {
        let leaves = self.leaf_ids();
        self.h_refine_elems(leaves, refinement)
    }

    /// Apply an [HRef] to a list of [Elem]s by their ID
    pub fn h_refine_elems(&mut self, elems: Vec<usize>, refinement: HRef) -> Result<(), HRefError> {
        self.execute_h_refinements(elems.iter().map(|elem_id| (*elem_id, refinement)).collect())
    }

    /// Execute a series of [HRef]s on [Elem]s specified by their id
    ///
    /// All refinements are validated before any are applied
    pub fn execute_h_refinements(
        &mut self,
        refinements: Vec<(usize, HRef)>,
    ) -> Result<(), HRefError> {
        let mut refinements_map: BTreeMap<usize, HRef> = BTreeMap::new();
        for (elem_id, h_ref) in refinements {
            if elem_id >= self.elems.len() {
                return Err(HRefError::ElemDoesntExist(elem_id));
            }
            if refinements_map.insert(elem_id, h_ref).is_some() {
                return Err(HRefError::DoubleRefinement(elem_id));
            }
            if self.elems[elem_id].has_children() {
                return Err(HRefError::ElemHasChildren(elem_id));
            }
            if violates_min_edge_length(&self.elems[elem_id].bounds, h_ref) {
                return Err(HRefError::MinEdgeLength(elem_id));
            }
        }

        let mut elem_id_tracker = self.elems.len();
        for (elem_id, refinement) in refinements_map {
            let new_elems = self.elems[elem_id].h_refine(refinement, &mut elem_id_tracker)?;
            self.elems.extend(new_elems);
        }

        Ok(())
    }

    // ----------------------------------------------------------------------------------------------------
    // p-refinement methods
    // ----------------------------------------------------------------------------------------------------

    /// Set the expansion orders on all [Elem]s
    pub fn set_global_expansion_orders(&mut self, orders: [u8; 2]) -> Result<(), PRefError> {
        self.set_expansion_orders(self.elems.iter().map(|elem| (elem.id, orders)).collect())
    }

    /// Set the expansion orders on [Elem]s specified by their id
    pub fn set_expansion_orders(
        &mut self,
        poly_orders: Vec<(usize, [u8; 2])>,
    ) -> Result<(), PRefError> {
        let mut poly_orders_map: BTreeMap<usize, [u8; 2]> = BTreeMap::new();
        for (elem_id, orders) in poly_orders {
            if elem_id >= self.elems.len() {
                return Err(PRefError::ElemDoesntExist(elem_id));
            }
            if poly_orders_map.insert(elem_id, orders).is_some() {
                return Err(PRefError::DoubleRefinement(elem_id));
            }
        }

        for (elem_id, orders) in poly_orders_map {
            self.elems[elem_id].poly_orders.set(orders)?;
        }

        Ok(())
    }
}

/// Would splitting `bounds` with `refinement` produce edges shorter than [MIN_EDGE_LENGTH]
pub(crate) fn violates_min_edge_length(bounds: &Rect, refinement: HRef) -> bool {
    [space::ParaDir::U, space::ParaDir::V]
        .iter()
        .any(|dir| refinement.splits(*dir) && bounds.extent(*dir) / 2.0 < MIN_EDGE_LENGTH)
}

// ----------------------------------------------------------------------------------------------------
// Mesh construction from JSON Utility functions
// ----------------------------------------------------------------------------------------------------

fn parse_element_information(
    mesh_file_json: &JsonValue,
    num_nodes: usize,
) -> Result<Vec<[usize; 4]>, MeshFileError> {
    if !mesh_file_json["Elements"].is_array() {
        return Err(MeshFileError::MissingArray("Elements"));
    }

    mesh_file_json["Elements"]
        .members()
        .enumerate()
        .map(|(element_id, json_element)| {
            let node_ids: Vec<usize> = json_element["node_ids"]
                .members()
                .filter_map(|node_id_json| node_id_json.as_usize())
                .filter(|node_id| *node_id < num_nodes)
                .collect();

            match <[usize; 4]>::try_from(node_ids) {
                Ok(node_ids)
                    if json_element["node_ids"].members().count() == 4
                        && !has_duplicates(&node_ids) =>
                {
                    Ok(node_ids)
                }
                _ => Err(MeshFileError::BadNodeIds(element_id)),
            }
        })
        .collect()
}

fn parse_node_information(mesh_file_json: &JsonValue) -> Result<Vec<Point>, MeshFileError> {
    if !mesh_file_json["Nodes"].is_array() {
        return Err(MeshFileError::MissingArray("Nodes"));
    }

    let node_points = mesh_file_json["Nodes"]
        .members()
        .enumerate()
        .map(|(node_id, json_node_point)| {
            if !json_node_point.is_array() || json_node_point.members().count() != 2 {
                return Err(MeshFileError::BadNode(node_id));
            }

            match (json_node_point[0].as_f64(), json_node_point[1].as_f64()) {
                (Some(x), Some(y)) => Ok(Point::new(x, y)),
                _ => Err(MeshFileError::BadNode(node_id)),
            }
        })
        .collect::<Result<Vec<Point>, _>>()?;

    for (node_id, point) in node_points.iter().enumerate() {
        if node_points.iter().skip(node_id + 1).any(|other| other == point) {
            return Err(MeshFileError::DuplicateNode(node_id));
        }
    }

    Ok(node_points)
}

fn is_axis_aligned(points: &[Point; 4]) -> bool {
    points[0].y == points[1].y
        && points[2].y == points[3].y
        && points[0].x == points[2].x
        && points[1].x == points[3].x
        && points[0].x < points[1].x
        && points[0].y < points[2].y
}

fn has_duplicates<T>(values: &[T]) -> bool
where
    T: PartialEq,
{
    for (i, val) in values.iter().enumerate() {
        for val_cmp in values.iter().skip(i + 1) {
            if val == val_cmp {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square(n: usize) -> Mesh {
        Mesh::rectangle(
            Rect::new(Point::new(0.0, 0.0), Point::new(1.0, 1.0)),
            [n, n],
        )
    }

    #[test]
    fn mesh_from_file() {
        let mesh = Mesh::from_file("./test_input/square.json").unwrap();

        assert_eq!(mesh.elements.len(), 4);
        assert_eq!(mesh.elems.len(), 4);

        for element in mesh.elements.iter() {
            assert!(element.points[3].x > element.points[0].x);
            assert!(element.points[3].y > element.points[0].y);
            assert!((element.bounds().area() - 1.0).abs() < 1e-14);
        }

        assert_eq!(mesh.locate(&Point::new(-0.5, -0.5)), Some(0));
        assert_eq!(mesh.locate(&Point::new(0.5, 0.5)), Some(3));
    }

    #[test]
    fn mesh_file_errors() {
        let not_aligned = json::parse(
            r#"{ "Elements": [{ "node_ids": [0, 1, 2, 3] }], "Nodes": [[0.0, 0.0], [1.0, 0.1], [0.0, 1.0], [1.0, 1.0]] }"#,
        )
        .unwrap();
        assert!(matches!(
            Mesh::from_json(&not_aligned),
            Err(MeshFileError::NotAxisAligned(0))
        ));

        let bad_ids = json::parse(
            r#"{ "Elements": [{ "node_ids": [0, 1, 2, 7] }], "Nodes": [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]] }"#,
        )
        .unwrap();
        assert!(matches!(
            Mesh::from_json(&bad_ids),
            Err(MeshFileError::BadNodeIds(0))
        ));

        let no_nodes = json::parse(r#"{ "Elements": [] }"#).unwrap();
        assert!(matches!(
            Mesh::from_json(&no_nodes),
            Err(MeshFileError::MissingArray("Nodes"))
        ));

        assert!(matches!(
            Mesh::from_file("./test_input/does_not_exist.json"),
            Err(MeshFileError::Io(_))
        ));
    }

    #[test]
    fn rectangle_layout() {
        let mesh = Mesh::rectangle(
            Rect::new(Point::new(0.0, 0.0), Point::new(3.0, 1.0)),
            [3, 2],
        );

        assert_eq!(mesh.num_leaves(), 6);
        assert_eq!(mesh.elements[4].points[0], Point::new(1.0, 0.5));
        assert_eq!(mesh.locate(&Point::new(2.5, 0.75)), Some(5));
    }

    #[test]
    fn basic_h_refinements() {
        let mut mesh = unit_square(2);
        mesh.h_refine_elems(vec![0], HRef::T).unwrap();
        mesh.h_refine_elems(vec![1, 2], HRef::U).unwrap();
        mesh.h_refine_elems(vec![3, 4], HRef::V).unwrap();

        assert_eq!(mesh.elems.len(), 4 + 4 + 4 + 4);
        assert_eq!(mesh.num_leaves(), 11);
        assert_eq!(mesh.elems[4].parent_id(), Some(0));
        assert!((mesh.elems[4].bounds.area() - 0.0625).abs() < 1e-14);

        let leaf_area: f64 = mesh.leaf_elems().map(|elem| elem.bounds.area()).sum();
        assert!((leaf_area - 1.0).abs() < 1e-12);
    }

    #[test]
    fn global_refinement_refines_leaves_only() {
        let mut mesh = unit_square(1);
        mesh.global_h_refinement(HRef::T).unwrap();
        mesh.global_h_refinement(HRef::T).unwrap();

        assert_eq!(mesh.num_leaves(), 16);
        assert_eq!(mesh.elems.len(), 1 + 4 + 16);
    }

    #[test]
    fn locate_and_overlap() {
        let mut mesh = unit_square(1);
        mesh.h_refine_elems(vec![0], HRef::T).unwrap();
        mesh.h_refine_elems(vec![1], HRef::T).unwrap();

        assert_eq!(mesh.locate(&Point::new(0.1, 0.1)), Some(5));
        assert_eq!(mesh.locate(&Point::new(0.9, 0.9)), Some(4));
        assert_eq!(mesh.locate(&Point::new(1.5, 0.5)), None);

        let region = Rect::new(Point::new(0.0, 0.0), Point::new(0.5, 0.5));
        assert_eq!(mesh.leaves_overlapping(&region), vec![5, 6, 7, 8]);

        let region = Rect::new(Point::new(0.2, 0.2), Point::new(0.6, 0.3));
        assert_eq!(mesh.leaves_overlapping(&region), vec![2, 5, 6, 7, 8]);
    }

    #[test]
    fn neighbors_and_hanging_levels() {
        let mut mesh = unit_square(2);
        mesh.h_refine_elems(vec![0], HRef::T).unwrap();
        mesh.h_refine_elems(vec![4], HRef::T).unwrap();

        // Elem 1 (SE base) borders two children of elem 0 on its West side
        assert_eq!(mesh.neighbors_across(&mesh.elems[1].bounds, Side::W), vec![5, 7]);
        assert!(mesh.neighbors_across(&mesh.elems[1].bounds, Side::E).is_empty());

        assert_eq!(mesh.hanging_level(&mesh.elems[1].bounds, &[]), 1);
        assert_eq!(mesh.hanging_level(&mesh.elems[9].bounds, &[]), 1);
        assert_eq!(mesh.hanging_level(&mesh.elems[8].bounds, &[]), 0);
        assert_eq!(mesh.hanging_level(&mesh.elems[3].bounds, &[]), 0);
        assert_eq!(mesh.hanging_level(&mesh.elems[1].bounds, &[5, 7]), 0);

        assert!(MeshRegularity::MaxHangingLevel(1).admits(1));
        assert!(!MeshRegularity::MaxHangingLevel(1).admits(2));
        assert!(MeshRegularity::Unconstrained.admits(200));
    }

    #[test]
    fn basic_p_refinements() {
        let mut mesh = unit_square(2);
        mesh.set_global_expansion_orders([1, 1]).unwrap();
        mesh.set_expansion_orders(vec![(0, [3, 3]), (1, [3, 2]), (2, [2, 3])])
            .unwrap();

        assert_eq!(mesh.elems[0].poly_orders.ni, 3);
        assert_eq!(mesh.elems[0].poly_orders.nj, 3);
        assert_eq!(mesh.elems[1].poly_orders.ni, 3);
        assert_eq!(mesh.elems[1].poly_orders.nj, 2);
        assert_eq!(mesh.elems[2].poly_orders.ni, 2);
        assert_eq!(mesh.elems[2].poly_orders.nj, 3);
        assert_eq!(mesh.elems[3].poly_orders.ni, 1);
    }

    #[test]
    fn children_inherit_expansion_orders() {
        let mut mesh = unit_square(1);
        mesh.set_global_expansion_orders([3, 2]).unwrap();
        mesh.global_h_refinement(HRef::U).unwrap();

        assert!(mesh
            .leaf_elems()
            .all(|elem| elem.poly_orders == p_refinement::PolyOrders::from(3, 2)));
    }

    #[cfg(feature = "json_export")]
    #[test]
    fn refined_mesh_to_json() {
        let mut mesh = unit_square(2);
        mesh.execute_h_refinements(vec![(0, HRef::T), (1, HRef::U), (2, HRef::V)])
            .unwrap();

        let mesh_json = mesh.to_json();
        assert_eq!(mesh_json["Elements"].members().count(), 4);
        assert_eq!(mesh_json["Elems"].members().count(), 12);
        assert_eq!(mesh_json["Elems"][0]["active"], false);
        assert_eq!(mesh_json["Elems"][3]["active"], true);
    }

    #[test]
    fn h_refine_non_existent() {
        let mut mesh = unit_square(1);
        assert_eq!(
            mesh.h_refine_elems(vec![0, 1], HRef::T),
            Err(HRefError::ElemDoesntExist(1))
        );
    }

    #[test]
    fn h_refine_elem_with_children() {
        let mut mesh = unit_square(1);
        mesh.h_refine_elems(vec![0], HRef::T).unwrap();
        assert_eq!(
            mesh.h_refine_elems(vec![0], HRef::T),
            Err(HRefError::ElemHasChildren(0))
        );
    }

    #[test]
    fn double_h_refinement() {
        let mut mesh = unit_square(2);
        assert_eq!(
            mesh.execute_h_refinements(vec![(0, HRef::T), (1, HRef::T), (0, HRef::U)]),
            Err(HRefError::DoubleRefinement(0))
        );
        // nothing was applied
        assert_eq!(mesh.elems.len(), 4);
    }

    #[test]
    fn minimum_edge_length_exceeded() {
        let mut mesh = unit_square(1);

        // repeatedly refine the bottom left cell
        let result = (0..18).try_for_each(|_| {
            let sw_leaf = mesh.locate(&Point::new(0.0, 0.0)).unwrap();
            mesh.h_refine_elems(vec![sw_leaf], HRef::T)
        });

        assert!(matches!(result, Err(HRefError::MinEdgeLength(_))));
        let sw_leaf = mesh.locate(&Point::new(0.0, 0.0)).unwrap();
        assert!(!mesh.elem_is_h_refineable(sw_leaf, HRef::T).unwrap());

        // the NE child of the first split was never refined
        let ne_child = mesh.elems[0].child_ids().unwrap()[3];
        assert!(!mesh.elems[ne_child].has_children());
        assert!(mesh.elem_is_h_refineable(ne_child, HRef::T).unwrap());

        // Elems with children are never refineable
        assert!(!mesh.elem_is_h_refineable(0, HRef::T).unwrap());
        assert!(mesh.elem_is_h_refineable(mesh.elems.len(), HRef::T).is_err());
    }

    #[test]
    fn expansion_order_errors() {
        let mut mesh = unit_square(1);
        mesh.set_global_expansion_orders([3, 3]).unwrap();

        assert_eq!(
            mesh.set_expansion_orders(vec![(0, [2, 2]), (1, [2, 2])]),
            Err(PRefError::ElemDoesntExist(1))
        );
        assert_eq!(
            mesh.set_expansion_orders(vec![(0, [2, 2]), (0, [4, 4])]),
            Err(PRefError::DoubleRefinement(0))
        );
        assert_eq!(
            mesh.set_expansion_orders(vec![(0, [0, 4])]),
            Err(PRefError::NegExpansion)
        );
        assert_eq!(
            mesh.set_expansion_orders(vec![(0, [MAX_POLYNOMIAL_ORDER + 1, 1])]),
            Err(PRefError::ExceededMaxExpansion)
        );
        assert_eq!(mesh.elems[0].poly_orders, p_refinement::PolyOrders::uniform(3));
    }
}

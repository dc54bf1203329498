use super::space::{Point, Rect};
#[cfg(feature = "json_export")]
use json::{array, object, JsonValue};

/// The `Element`s are the basic geometric unit of the Mesh in Real Space.
///
/// Mesh files describe the `Element`s in the domain; not the `Elem`s.
/// Upon `Mesh` construction, each `Element` has one associated `Elem`, but more can be added through h-Refinements
///
/// Elements are axis aligned quadrilaterals. Their points are ordered: `[SW, SE, NW, NE]`
#[derive(Debug)]
pub struct Element {
    pub id: usize,
    pub points: [Point; 4],
}

impl Element {
    /// Create a new element defined by its coordinates in real space
    pub fn new(id: usize, points: [Point; 4]) -> Self {
        Self { id, points }
    }

    /// The region of Real Space covered by this Element
    pub fn bounds(&self) -> Rect {
        Rect::new(self.points[0], self.points[3])
    }

    /// Produce a Json Object that describes this Element
    #[cfg(feature = "json_export")]
    pub fn to_json(&self) -> JsonValue {
        object! {
            "id": self.id,
            "min": array![self.points[0].x, self.points[0].y],
            "max": array![self.points[3].x, self.points[3].y],
        }
    }
}

use std::fmt;
use std::ops::{Add, Index, Mul, Sub};

/// A location in Real Space
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// The point halfway between two points
    pub fn between(p0: &Self, p1: &Self) -> Self {
        Self {
            x: (p0.x + p1.x) / 2.0,
            y: (p0.y + p1.y) / 2.0,
        }
    }

    /// Squared distance from the origin
    pub fn norm_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({:.5}, {:.5})", self.x, self.y)
    }
}

/// Parametric direction of a split or an Elem side
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParaDir {
    U,
    V,
}

/// A side of an axis aligned rectangle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    S,
    N,
    W,
    E,
}

impl Side {
    pub const ALL: [Self; 4] = [Self::S, Self::N, Self::W, Self::E];

    /// The direction running along this side
    pub fn dir(&self) -> ParaDir {
        match self {
            Self::S | Self::N => ParaDir::U,
            Self::W | Self::E => ParaDir::V,
        }
    }
}

/// An axis aligned rectangle in Real Space described by its "smallest" and "largest" corners
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub min: Point,
    pub max: Point,
}

/// Intersections thinner than this are considered empty
pub const OVERLAP_TOLERANCE: f64 = 1e-12;

impl Rect {
    pub const fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> Point {
        Point::between(&self.min, &self.max)
    }

    /// Extent along a parametric direction
    pub fn extent(&self, dir: ParaDir) -> f64 {
        match dir {
            ParaDir::U => self.width(),
            ParaDir::V => self.height(),
        }
    }

    /// Does the (closed) rectangle contain the point
    pub fn contains(&self, p: &Point) -> bool {
        p.x >= self.min.x - OVERLAP_TOLERANCE
            && p.x <= self.max.x + OVERLAP_TOLERANCE
            && p.y >= self.min.y - OVERLAP_TOLERANCE
            && p.y <= self.max.y + OVERLAP_TOLERANCE
    }

    /// The intersection of two rectangles if it has a positive area
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let min = Point::new(self.min.x.max(other.min.x), self.min.y.max(other.min.y));
        let max = Point::new(self.max.x.min(other.max.x), self.max.y.min(other.max.y));

        if max.x - min.x > OVERLAP_TOLERANCE && max.y - min.y > OVERLAP_TOLERANCE {
            Some(Self { min, max })
        } else {
            None
        }
    }

    /// A thin rectangle of the given thickness lying just outside one side
    pub fn outer_strip(&self, side: Side, thickness: f64) -> Self {
        match side {
            Side::S => Self::new(
                Point::new(self.min.x, self.min.y - thickness),
                Point::new(self.max.x, self.min.y),
            ),
            Side::N => Self::new(
                Point::new(self.min.x, self.max.y),
                Point::new(self.max.x, self.max.y + thickness),
            ),
            Side::W => Self::new(
                Point::new(self.min.x - thickness, self.min.y),
                Point::new(self.min.x, self.max.y),
            ),
            Side::E => Self::new(
                Point::new(self.max.x, self.min.y),
                Point::new(self.max.x + thickness, self.max.y),
            ),
        }
    }

    /// Map a point into the [-1, 1] x [-1, 1] parametric coordinates of this rectangle
    pub fn local_coords(&self, p: &Point) -> [f64; 2] {
        [
            2.0 * (p.x - self.min.x) / self.width() - 1.0,
            2.0 * (p.y - self.min.y) / self.height() - 1.0,
        ]
    }

    /// Derivatives of the local coordinates with respect to x and y
    pub fn local_scale(&self) -> V2D {
        V2D::from([2.0 / self.width(), 2.0 / self.height()])
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{} -- {}]", self.min, self.max)
    }
}

/// A 2D vector (used for gradients)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct V2D {
    inner: [f64; 2],
}

impl V2D {
    pub const fn from([x, y]: [f64; 2]) -> Self {
        Self { inner: [x, y] }
    }

    pub fn x(&self) -> f64 {
        self.inner[0]
    }

    pub fn y(&self) -> f64 {
        self.inner[1]
    }

    pub fn dot_with(&self, other: &Self) -> f64 {
        self[0] * other[0] + self[1] * other[1]
    }

    pub fn norm_squared(&self) -> f64 {
        self.dot_with(self)
    }
}

impl Default for V2D {
    fn default() -> Self {
        Self { inner: [0.0; 2] }
    }
}

impl Index<usize> for V2D {
    type Output = f64;
    fn index(&self, index: usize) -> &Self::Output {
        &self.inner[index]
    }
}

impl Add for V2D {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            inner: [self[0] + other[0], self[1] + other[1]],
        }
    }
}

impl Sub for V2D {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self {
            inner: [self[0] - other[0], self[1] - other[1]],
        }
    }
}

impl Mul<f64> for V2D {
    type Output = Self;
    fn mul(self, coefficient: f64) -> Self {
        Self {
            inner: [self[0] * coefficient, self[1] * coefficient],
        }
    }
}

impl Mul<Self> for V2D {
    type Output = Self;
    fn mul(self, other: Self) -> Self {
        Self {
            inner: [self[0] * other[0], self[1] * other[1]],
        }
    }
}

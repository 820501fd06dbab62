#![forbid(unsafe_code)]

//! Grid geometry primitives.
//!
//! Layout output is expressed in abstract grid units: one unit is one person
//! slot. Columns are fractional because partner gaps can widen to make room
//! for date annotations; rows are whole generations, growing downward.

use serde::{Deserialize, Serialize};

/// A point in grid space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GridPoint {
    pub x: f64,
    pub y: f64,
}

impl GridPoint {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Offset the point by `(dx, dy)`.
    #[inline]
    #[must_use]
    pub fn translate(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Reflect the point across the vertical axis `x = 0`.
    #[inline]
    #[must_use]
    pub fn mirrored(self) -> Self {
        Self::new(-self.x, self.y)
    }
}

/// Axis-aligned bounding box in grid units.
///
/// Width and height are stored alongside the edges so serialized output
/// carries all six values renderers ask for.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    left: f64,
    right: f64,
    top: f64,
    bottom: f64,
    width: f64,
    height: f64,
}

impl Bounds {
    /// Bounds spanning the given edges.
    #[must_use]
    pub fn new(left: f64, right: f64, top: f64, bottom: f64) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
            width: right - left,
            height: bottom - top,
        }
    }

    /// The unit slot of a box centered at `(x, y)`.
    #[must_use]
    pub fn slot(x: f64, y: f64) -> Self {
        Self::new(x - 0.5, x + 0.5, y - 0.5, y + 0.5)
    }

    #[inline]
    pub const fn left(&self) -> f64 {
        self.left
    }

    #[inline]
    pub const fn right(&self) -> f64 {
        self.right
    }

    #[inline]
    pub const fn top(&self) -> f64 {
        self.top
    }

    #[inline]
    pub const fn bottom(&self) -> f64 {
        self.bottom
    }

    #[inline]
    pub const fn width(&self) -> f64 {
        self.width
    }

    #[inline]
    pub const fn height(&self) -> f64 {
        self.height
    }

    /// Smallest bounds covering both boxes.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self::new(
            self.left.min(other.left),
            self.right.max(other.right),
            self.top.min(other.top),
            self.bottom.max(other.bottom),
        )
    }

    #[must_use]
    pub fn translate(self, dx: f64, dy: f64) -> Self {
        Self::new(
            self.left + dx,
            self.right + dx,
            self.top + dy,
            self.bottom + dy,
        )
    }

    /// Reflect across `x = 0`; left and right swap.
    #[must_use]
    pub fn mirrored(self) -> Self {
        Self::new(-self.right, -self.left, self.top, self.bottom)
    }

    /// Half-open containment: left/top edges inclusive, right/bottom exclusive.
    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }
}

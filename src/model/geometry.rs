//! Axis-aligned rectangle math for detection bounding boxes.

use serde::{Deserialize, Serialize};

/// An axis-aligned bounding rectangle in page coordinates.
///
/// The y axis grows downward (image coordinates), so `y0` is the top edge
/// and `y1` the bottom edge. Serialized as `[[x0, y0], [x1, y1]]` to match
/// the annotation store contract.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[[f64; 2]; 2]", into = "[[f64; 2]; 2]")]
pub struct Rect {
    /// Left edge
    pub x0: f64,
    /// Top edge
    pub y0: f64,
    /// Right edge
    pub x1: f64,
    /// Bottom edge
    pub y1: f64,
}

impl Rect {
    /// Create a rectangle from corner coordinates.
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Width of the rectangle.
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    /// Height of the rectangle.
    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// Area of the rectangle.
    pub fn area(&self) -> f64 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Smallest rectangle containing both `self` and `other`.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Overlapping region of the two rectangles, if any.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x0.max(other.x0);
        let y0 = self.y0.max(other.y0);
        let x1 = self.x1.min(other.x1);
        let y1 = self.y1.min(other.y1);
        if x0 < x1 && y0 < y1 {
            Some(Rect { x0, y0, x1, y1 })
        } else {
            None
        }
    }

    /// Overlap length of the horizontal (x) projections of the two rectangles.
    pub fn horizontal_overlap_len(&self, other: &Rect) -> f64 {
        (self.x1.min(other.x1) - self.x0.max(other.x0)).max(0.0)
    }

    /// Overlap length of the vertical (y) projections of the two rectangles.
    pub fn vertical_overlap_len(&self, other: &Rect) -> f64 {
        (self.y1.min(other.y1) - self.y0.max(other.y0)).max(0.0)
    }

    /// Gap between the facing vertical edges, zero when the projections overlap.
    pub fn horizontal_gap(&self, other: &Rect) -> f64 {
        (self.x0.max(other.x0) - self.x1.min(other.x1)).max(0.0)
    }

    /// Gap between the facing horizontal edges, zero when the projections overlap.
    pub fn vertical_gap(&self, other: &Rect) -> f64 {
        (self.y0.max(other.y0) - self.y1.min(other.y1)).max(0.0)
    }

    /// Whether this rectangle fully contains `other`.
    pub fn contains(&self, other: &Rect) -> bool {
        self.x0 <= other.x0 && self.y0 <= other.y0 && self.x1 >= other.x1 && self.y1 >= other.y1
    }
}

impl From<[[f64; 2]; 2]> for Rect {
    fn from(points: [[f64; 2]; 2]) -> Self {
        Rect {
            x0: points[0][0],
            y0: points[0][1],
            x1: points[1][0],
            y1: points[1][1],
        }
    }
}

impl From<Rect> for [[f64; 2]; 2] {
    fn from(r: Rect) -> Self {
        [[r.x0, r.y0], [r.x1, r.y1]]
    }
}

/// Integer pixel rectangles and floating-point screen rectangles.

use glam::Vec2;

/// Integer pixel rectangle (left/top inclusive, right/bottom exclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct IntRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl IntRect {
    pub const ZERO: IntRect = IntRect { left: 0, top: 0, right: 0, bottom: 0 };

    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

/// Floating-point rectangle, typically in normalized device coordinates.
///
/// Starts undefined like `BoundingBox`; merging a point defines it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Default for Rect {
    fn default() -> Self {
        Self::UNDEFINED
    }
}

impl Rect {
    pub const UNDEFINED: Rect = Rect {
        min: Vec2::splat(f32::INFINITY),
        max: Vec2::splat(f32::NEG_INFINITY),
    };

    /// The whole -1..1 NDC square
    pub const FULL: Rect = Rect { min: Vec2::splat(-1.0), max: Vec2::splat(1.0) };

    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn is_defined(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn merge_point(&mut self, point: Vec2) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn merge(&mut self, other: &Rect) {
        if other.is_defined() {
            self.min = self.min.min(other.min);
            self.max = self.max.max(other.max);
        }
    }

    /// Clamp to `bounds`; may become undefined when disjoint
    pub fn clipped(&self, bounds: &Rect) -> Self {
        Self::new(self.min.max(bounds.min), self.max.min(bounds.max))
    }
}

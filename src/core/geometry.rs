//! Screen geometry in logical units.
//!
//! All coordinates are screen-space and signed, so windows may sit partly
//! off-screen while they are being dragged around.

use serde::{Deserialize, Serialize};

/// A point on the screen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Offset by a displacement
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// A width/height pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Largest size with this aspect ratio that fits inside `bounds`
    pub fn fit_within(&self, bounds: Size) -> Size {
        if self.is_empty() || bounds.is_empty() {
            return Size::default();
        }
        let scale_w = bounds.width as f64 / self.width as f64;
        let scale_h = bounds.height as f64 / self.height as f64;
        let scale = scale_w.min(scale_h);
        Size::new(
            ((self.width as f64 * scale).round() as u32).clamp(1, bounds.width),
            ((self.height as f64 * scale).round() as u32).clamp(1, bounds.height),
        )
    }
}

/// An axis-aligned rectangle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn from_origin(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    /// Check if a point is inside this rectangle (right/bottom edges exclusive)
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    /// Same size, new origin
    pub fn moved_to(&self, origin: Point) -> Self {
        Self::new(origin.x, origin.y, self.width, self.height)
    }

    /// Rectangle of `size` centred inside this one
    pub fn centered(&self, size: Size) -> Self {
        let x = self.x + (self.width as i32 - size.width as i32) / 2;
        let y = self.y + (self.height as i32 - size.height as i32) / 2;
        Self::new(x, y, size.width, size.height)
    }
}

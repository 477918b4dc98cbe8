//! An example pooled resource: a named image with a placement.

use crate::Poolable;
use std::fmt;
use tracing::trace;

/// A point on the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point2D {
    /// Horizontal coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
}

impl Point2D {
    /// Creates a point.
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// An image that is expensive to load, so it is worth pooling.
///
/// The name is fixed when the bitmap is created and never managed by the
/// pool. The location is caller state and is cleared on reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    name: String,
    location: Option<Point2D>,
}

impl Bitmap {
    /// Loads the bitmap called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: None,
        }
    }

    /// Gets the name the bitmap was loaded with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets where the bitmap is placed, if anywhere.
    pub fn location(&self) -> Option<Point2D> {
        self.location
    }

    /// Places the bitmap.
    pub fn set_location(&mut self, location: Point2D) {
        self.location = Some(location);
    }

    /// Draws the bitmap at its current location and returns what was drawn.
    pub fn draw(&self) -> String {
        let drawn = self.to_string();
        trace!(bitmap = %self.name, "{drawn}");
        drawn
    }
}

impl fmt::Display for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(location) => write!(f, "{} @ {}", self.name, location),
            None => write!(f, "{} @ unplaced", self.name),
        }
    }
}

impl Poolable for Bitmap {
    fn reset(&mut self) {
        self.location = None;
    }
}

//! Shapes drawn on a rasterised page.
//!
//! The browser canvas reports each drawn object as a small JSON record
//! tagged by `type`. Coordinates are in page-image pixels (the front end
//! undoes its display zoom before sending).

use serde::{Deserialize, Serialize};

/// One object drawn on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CanvasObject {
    /// A straight line segment.
    Line(Line),
    /// An axis-aligned rectangle, possibly stretched by the canvas handles.
    Rect(Rect),
    /// Anything else the canvas can produce (circles, paths, text…).
    #[serde(other)]
    Other,
}

impl CanvasObject {
    /// The shape name used in messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            CanvasObject::Line(_) => "line",
            CanvasObject::Rect(_) => "rect",
            CanvasObject::Other => "other",
        }
    }

    pub fn as_line(&self) -> Option<&Line> {
        match self {
            CanvasObject::Line(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_rect(&self) -> Option<&Rect> {
        match self {
            CanvasObject::Rect(r) => Some(r),
            _ => None,
        }
    }
}

/// A line from `(x1, y1)` to `(x2, y2)`. Missing coordinates read as 0.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Line {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Line {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Euclidean length in pixels.
    pub fn length_px(&self) -> f64 {
        (self.x2 - self.x1).hypot(self.y2 - self.y1)
    }
}

/// A rectangle as the canvas reports it: origin, nominal size and the
/// stretch factors applied by the resize handles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    #[serde(rename = "scaleX")]
    pub scale_x: f64,
    #[serde(rename = "scaleY")]
    pub scale_y: f64,
}

impl Default for Rect {
    fn default() -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width: 0.0,
            height: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
            ..Self::default()
        }
    }

    /// Effective width in pixels. Negative sizes (dragged up/left) count
    /// by magnitude.
    pub fn width_px(&self) -> f64 {
        (self.width * self.scale_x).abs()
    }

    /// Effective height in pixels.
    pub fn height_px(&self) -> f64 {
        (self.height * self.scale_y).abs()
    }
}

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

pub mod accounts;
pub mod area;
pub mod capture;
pub mod chat;
pub mod estimator;
pub mod geometry;
pub mod ledger;
pub mod project_file;
pub mod projects;
pub mod scene;
pub mod store;
pub mod units;

pub use area::{AreaError, Measurement, PolygonMethod, QuadMethod};
pub use capture::{CaptureEvent, Key, Request, Response};
pub use estimator::{Effect, Estimator};
pub use ledger::{Ledger, Selection, SelectionSummary, Snapshot};
pub use project_file::{Blueprint, ExportedState, ImageError, ImportError, ProjectFile};

/// A point in unit space: each axis is a fraction of the canvas size at the
/// time it was recorded.
#[derive(Serialize, Deserialize, Encode, Decode, Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn clamp(self) -> Self {
        Self {
            x: clamp_unit(self.x),
            y: clamp_unit(self.y),
        }
    }
}

fn clamp_unit(value: f64) -> f64 {
    value.max(0.0).min(1.0)
}

/// A point in the pixel space of the visible canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl CanvasSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn min_side(&self) -> f64 {
        self.width.min(self.height)
    }

    pub fn is_drawable(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Rect,
    Circle,
    Triangle,
    Polygon,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Rect, Mode::Circle, Mode::Triangle, Mode::Polygon];

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Rect => "rect",
            Mode::Circle => "circle",
            Mode::Triangle => "triangle",
            Mode::Polygon => "polygon",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Mode::ALL.into_iter().find(|mode| mode.as_str() == value)
    }
}

/// Geometry of a drawn shape. Used for rendering; area comes from the
/// measurement attached to the selection.
#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ShapeDescriptor {
    Rect { a: Point, b: Point },
    /// `radius` is a fraction of `min(width, height)`.
    Circle { center: Point, radius: f64 },
    Triangle { points: [Point; 3] },
    Polygon { points: Vec<Point> },
}

impl ShapeDescriptor {
    pub fn kind(&self) -> Mode {
        match self {
            ShapeDescriptor::Rect { .. } => Mode::Rect,
            ShapeDescriptor::Circle { .. } => Mode::Circle,
            ShapeDescriptor::Triangle { .. } => Mode::Triangle,
            ShapeDescriptor::Polygon { .. } => Mode::Polygon,
        }
    }

    /// Clamps every point back into unit space. Returns `None` when the
    /// geometry cannot be drawn at all.
    pub fn sanitized(self) -> Option<Self> {
        let finite = |point: &Point| point.x.is_finite() && point.y.is_finite();
        match self {
            ShapeDescriptor::Rect { a, b } => {
                if !finite(&a) || !finite(&b) {
                    return None;
                }
                Some(ShapeDescriptor::Rect {
                    a: a.clamp(),
                    b: b.clamp(),
                })
            }
            ShapeDescriptor::Circle { center, radius } => {
                if !finite(&center) || !radius.is_finite() || radius < 0.0 {
                    return None;
                }
                Some(ShapeDescriptor::Circle {
                    center: center.clamp(),
                    radius,
                })
            }
            ShapeDescriptor::Triangle { points } => {
                if !points.iter().all(finite) {
                    return None;
                }
                Some(ShapeDescriptor::Triangle {
                    points: points.map(Point::clamp),
                })
            }
            ShapeDescriptor::Polygon { points } => {
                if points.len() < 3 || !points.iter().all(finite) {
                    return None;
                }
                Some(ShapeDescriptor::Polygon {
                    points: points.into_iter().map(Point::clamp).collect(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_pulls_points_into_unit_square() {
        let point = Point::new(-0.5, 1.7).clamp();
        assert_eq!(point, Point::new(0.0, 1.0));
    }

    #[test]
    fn clamp_maps_nan_to_zero() {
        let point = Point::new(f64::NAN, 0.25).clamp();
        assert_eq!(point, Point::new(0.0, 0.25));
    }

    #[test]
    fn mode_round_trips_through_names() {
        for mode in Mode::ALL {
            assert_eq!(Mode::parse(mode.as_str()), Some(mode));
        }
        assert_eq!(Mode::parse("hexagon"), None);
    }

    #[test]
    fn shape_descriptor_uses_type_tag() {
        let shape = ShapeDescriptor::Circle {
            center: Point::new(0.5, 0.5),
            radius: 0.1,
        };
        let json = serde_json::to_value(&shape).unwrap();
        assert_eq!(json["type"], "circle");
        assert_eq!(json["radius"], 0.1);
    }

    #[test]
    fn polygon_with_two_points_is_not_drawable() {
        let shape = ShapeDescriptor::Polygon {
            points: vec![Point::new(0.1, 0.1), Point::new(0.2, 0.2)],
        };
        assert!(shape.sanitized().is_none());
    }
}

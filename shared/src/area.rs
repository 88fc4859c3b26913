//! Area computation from real-world measurements.
//!
//! Every function here is pure: it looks only at user-entered lengths in
//! decimal feet, never at pixel geometry. The one exception is
//! [`estimate_from_drawing`], which is only ever used to suggest a value.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{ring_edges, shoelace_area};
use crate::PixelPoint;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AreaError {
    #[error("{name} must be a positive number of feet (got {value})")]
    InvalidLength { name: &'static str, value: f64 },
    #[error("sides {a}, {b} and {c} cannot form a triangle")]
    DegenerateTriangle { a: f64, b: f64, c: f64 },
    #[error("a polygon needs at least 3 edges (got {0})")]
    TooFewEdges(usize),
    #[error("the {method} method does not apply to a {edges}-edge polygon")]
    MethodMismatch { method: &'static str, edges: usize },
    #[error("total area must be a positive number of square feet (got {0})")]
    InvalidArea(f64),
}

/// User-supplied physical lengths for one shape, in decimal feet.
#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq)]
#[serde(
    tag = "type",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Measurement {
    Rect { width: f64, height: f64 },
    Circle { radius: f64 },
    Triangle { base: f64, height: f64 },
    TriangleSides { a: f64, b: f64, c: f64 },
    Polygon { edges: Vec<f64>, method: PolygonMethod },
}

/// How a polygon's area was derived from its edges.
#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq)]
#[serde(
    tag = "method",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum PolygonMethod {
    /// Three edges, Heron's formula.
    Heron,
    /// Four edges, product of two designated adjacent sides.
    Rectangle { side_a: f64, side_b: f64 },
    Trapezoid { top: f64, bottom: f64, height: f64 },
    /// Area entered directly by the user.
    Manual { area: f64 },
}

/// The sub-method picked for a four-edge polygon.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuadMethod {
    Rectangle,
    Trapezoid,
    Irregular,
}

impl QuadMethod {
    /// Accepts the menu number or the name. Anything else is no choice.
    pub fn from_choice(choice: &str) -> Option<Self> {
        match choice.trim().to_lowercase().as_str() {
            "1" | "r" | "rect" | "rectangle" | "square" => Some(QuadMethod::Rectangle),
            "2" | "t" | "trap" | "trapezoid" => Some(QuadMethod::Trapezoid),
            "3" | "i" | "irregular" => Some(QuadMethod::Irregular),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QuadMethod::Rectangle => "Rectangle / square",
            QuadMethod::Trapezoid => "Trapezoid",
            QuadMethod::Irregular => "Irregular (enter area)",
        }
    }
}

/// Suggested trapezoid inputs, taken from the sorted edge lengths.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrapezoidDefaults {
    pub top: f64,
    pub bottom: f64,
    pub height: f64,
}

pub fn trapezoid_defaults(edges: &[f64; 4]) -> TrapezoidDefaults {
    let mut sorted = *edges;
    sorted.sort_by(f64::total_cmp);
    TrapezoidDefaults {
        top: sorted[1],
        bottom: sorted[3],
        height: sorted[0],
    }
}

pub fn area_sq_ft(measurement: &Measurement) -> Result<f64, AreaError> {
    match measurement {
        Measurement::Rect { width, height } => rectangle_area(*width, *height),
        Measurement::Circle { radius } => circle_area(*radius),
        Measurement::Triangle { base, height } => triangle_area(*base, *height),
        Measurement::TriangleSides { a, b, c } => heron_area(*a, *b, *c),
        Measurement::Polygon { edges, method } => polygon_area(edges, method),
    }
}

pub fn rectangle_area(width: f64, height: f64) -> Result<f64, AreaError> {
    Ok(positive("width", width)? * positive("height", height)?)
}

pub fn circle_area(radius: f64) -> Result<f64, AreaError> {
    let radius = positive("radius", radius)?;
    Ok(std::f64::consts::PI * radius * radius)
}

pub fn triangle_area(base: f64, height: f64) -> Result<f64, AreaError> {
    Ok(0.5 * positive("base", base)? * positive("height", height)?)
}

pub fn heron_area(a: f64, b: f64, c: f64) -> Result<f64, AreaError> {
    let a = positive("side a", a)?;
    let b = positive("side b", b)?;
    let c = positive("side c", c)?;
    let s = (a + b + c) / 2.0;
    let radicand = s * (s - a) * (s - b) * (s - c);
    if radicand.is_nan() || radicand <= 0.0 {
        return Err(AreaError::DegenerateTriangle { a, b, c });
    }
    Ok(radicand.sqrt())
}

pub fn trapezoid_area(top: f64, bottom: f64, height: f64) -> Result<f64, AreaError> {
    let top = positive("top base", top)?;
    let bottom = positive("bottom base", bottom)?;
    let height = positive("height", height)?;
    Ok((top + bottom) / 2.0 * height)
}

pub fn polygon_area(edges: &[f64], method: &PolygonMethod) -> Result<f64, AreaError> {
    if edges.len() < 3 {
        return Err(AreaError::TooFewEdges(edges.len()));
    }
    for edge in edges {
        positive("edge", *edge)?;
    }
    match method {
        PolygonMethod::Heron => match edges {
            [a, b, c] => heron_area(*a, *b, *c),
            _ => Err(AreaError::MethodMismatch {
                method: "three-side",
                edges: edges.len(),
            }),
        },
        PolygonMethod::Rectangle { side_a, side_b } => {
            require_four(edges, "rectangle")?;
            rectangle_area(*side_a, *side_b)
        }
        PolygonMethod::Trapezoid {
            top,
            bottom,
            height,
        } => {
            require_four(edges, "trapezoid")?;
            trapezoid_area(*top, *bottom, *height)
        }
        PolygonMethod::Manual { area } => {
            if area.is_finite() && *area > 0.0 {
                Ok(*area)
            } else {
                Err(AreaError::InvalidArea(*area))
            }
        }
    }
}

/// Estimates square footage from the drawn outline: shoelace area in pixels
/// scaled by `(sum of real edges / sum of pixel edges)^2`. Assumes one
/// uniform scale across the whole drawing.
pub fn estimate_from_drawing(points: &[PixelPoint], real_edges: &[f64]) -> Option<f64> {
    if points.len() < 3 || real_edges.len() != points.len() {
        return None;
    }
    let pixel_perimeter: f64 = ring_edges(points).iter().sum();
    let real_perimeter: f64 = real_edges.iter().sum();
    if !(pixel_perimeter > 0.0 && real_perimeter > 0.0) {
        return None;
    }
    let scale = real_perimeter / pixel_perimeter;
    let area = shoelace_area(points) * scale * scale;
    (area.is_finite() && area > 0.0).then_some(area)
}

fn require_four(edges: &[f64], method: &'static str) -> Result<(), AreaError> {
    if edges.len() == 4 {
        Ok(())
    } else {
        Err(AreaError::MethodMismatch {
            method,
            edges: edges.len(),
        })
    }
}

fn positive(name: &'static str, value: f64) -> Result<f64, AreaError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(AreaError::InvalidLength { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn rectangle_ten_by_twelve() {
        assert_eq!(rectangle_area(10.0, 12.0), Ok(120.0));
    }

    #[test]
    fn circle_radius_six() {
        let area = circle_area(6.0).unwrap();
        assert_eq!(crate::units::format_sq_ft(area), "113.10");
    }

    #[test]
    fn triangle_base_height() {
        assert_eq!(triangle_area(10.0, 8.0), Ok(40.0));
    }

    #[test]
    fn heron_three_four_five() {
        assert!(close(heron_area(3.0, 4.0, 5.0).unwrap(), 6.0));
    }

    #[test]
    fn heron_rejects_impossible_sides() {
        assert!(matches!(
            heron_area(1.0, 2.0, 3.0),
            Err(AreaError::DegenerateTriangle { .. })
        ));
        assert!(matches!(
            heron_area(1.0, 1.0, 10.0),
            Err(AreaError::DegenerateTriangle { .. })
        ));
    }

    #[test]
    fn zero_length_is_rejected() {
        assert_eq!(
            rectangle_area(0.0, 4.0),
            Err(AreaError::InvalidLength {
                name: "width",
                value: 0.0
            })
        );
        assert!(circle_area(f64::NAN).is_err());
    }

    #[test]
    fn quad_rectangle_uses_designated_sides() {
        let method = PolygonMethod::Rectangle {
            side_a: 8.0,
            side_b: 5.0,
        };
        assert_eq!(polygon_area(&[8.0, 5.0, 8.0, 5.0], &method), Ok(40.0));
    }

    #[test]
    fn quad_methods_need_four_edges() {
        let method = PolygonMethod::Trapezoid {
            top: 2.0,
            bottom: 4.0,
            height: 3.0,
        };
        assert_eq!(
            polygon_area(&[1.0, 1.0, 1.0, 1.0, 1.0], &method),
            Err(AreaError::MethodMismatch {
                method: "trapezoid",
                edges: 5
            })
        );
        assert_eq!(polygon_area(&[3.0, 4.0, 5.0, 5.0], &method), Ok(9.0));
    }

    #[test]
    fn heron_method_needs_three_edges() {
        assert!(polygon_area(&[3.0, 4.0, 5.0], &PolygonMethod::Heron).is_ok());
        assert!(polygon_area(&[3.0, 4.0, 5.0, 6.0], &PolygonMethod::Heron).is_err());
    }

    #[test]
    fn manual_area_is_taken_as_is() {
        let edges = [3.0, 4.0, 5.0, 6.0, 7.0];
        let area = polygon_area(&edges, &PolygonMethod::Manual { area: 210.5 });
        assert_eq!(area, Ok(210.5));
        assert_eq!(
            polygon_area(&edges, &PolygonMethod::Manual { area: -1.0 }),
            Err(AreaError::InvalidArea(-1.0))
        );
    }

    #[test]
    fn trapezoid_defaults_sort_edges() {
        let defaults = trapezoid_defaults(&[12.0, 5.0, 8.0, 5.5]);
        assert_eq!(
            defaults,
            TrapezoidDefaults {
                top: 5.5,
                bottom: 12.0,
                height: 5.0
            }
        );
    }

    #[test]
    fn drawing_estimate_scales_pixel_area() {
        // 100 px square labelled as 10 ft per side: 0.1 ft/px.
        let square = [
            PixelPoint::new(0.0, 0.0),
            PixelPoint::new(100.0, 0.0),
            PixelPoint::new(100.0, 100.0),
            PixelPoint::new(0.0, 100.0),
        ];
        let area = estimate_from_drawing(&square, &[10.0, 10.0, 10.0, 10.0]).unwrap();
        assert!(close(area, 100.0));
        assert_eq!(estimate_from_drawing(&square, &[10.0, 10.0]), None);
    }

    #[test]
    fn quad_choice_parsing() {
        assert_eq!(QuadMethod::from_choice(" 1 "), Some(QuadMethod::Rectangle));
        assert_eq!(QuadMethod::from_choice("Trapezoid"), Some(QuadMethod::Trapezoid));
        assert_eq!(QuadMethod::from_choice("3"), Some(QuadMethod::Irregular));
        assert_eq!(QuadMethod::from_choice(""), None);
        assert_eq!(QuadMethod::from_choice("4"), None);
    }

    #[test]
    fn measurement_serializes_camel_case() {
        let measurement = Measurement::Polygon {
            edges: vec![8.0, 5.0, 8.0, 5.0],
            method: PolygonMethod::Rectangle {
                side_a: 8.0,
                side_b: 5.0,
            },
        };
        let value = serde_json::to_value(&measurement).unwrap();
        assert_eq!(value["type"], "polygon");
        assert_eq!(value["method"]["method"], "rectangle");
        assert_eq!(value["method"]["sideA"], 8.0);
        let sides = serde_json::to_value(Measurement::TriangleSides {
            a: 3.0,
            b: 4.0,
            c: 5.0,
        })
        .unwrap();
        assert_eq!(sides["type"], "triangleSides");
    }
}

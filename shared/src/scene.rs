//! Turns estimator state into pixel-space drawing primitives for the
//! current canvas. Painting them is the front end's job.

use crate::capture::Preview;
use crate::geometry::{radius_to_pixels, to_pixel, vertex_centroid};
use crate::ledger::Selection;
use crate::units::format_sq_ft;
use crate::{Estimator, PixelPoint, ShapeDescriptor};

/// Radius of the pin dots drawn on in-progress polygons.
pub const PIN_RADIUS_PX: f64 = 4.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layer {
    Committed,
    Preview,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Primitive {
    Rect {
        layer: Layer,
        a: PixelPoint,
        b: PixelPoint,
    },
    Circle {
        layer: Layer,
        center: PixelPoint,
        radius: f64,
    },
    Path {
        layer: Layer,
        points: Vec<PixelPoint>,
        closed: bool,
    },
    /// A pin, or with `highlight` the target that closes a polygon.
    Marker {
        center: PixelPoint,
        radius: f64,
        highlight: bool,
    },
    Text {
        position: PixelPoint,
        text: String,
    },
}

pub fn build(estimator: &Estimator) -> Vec<Primitive> {
    let size = estimator.size();
    let mut primitives = Vec::new();
    for selection in estimator.ledger().selections() {
        let (shape, anchor) = committed_shape(selection, size);
        primitives.push(shape);
        primitives.push(Primitive::Text {
            position: anchor,
            text: format!("{}: {} sq ft", selection.label, format_sq_ft(selection.area_sq_ft)),
        });
    }
    if let Some(preview) = estimator.preview() {
        preview_primitives(preview, &mut primitives);
    }
    primitives
}

fn committed_shape(selection: &Selection, size: crate::CanvasSize) -> (Primitive, PixelPoint) {
    let layer = Layer::Committed;
    match &selection.shape {
        ShapeDescriptor::Rect { a, b } => {
            let (a, b) = (to_pixel(*a, size), to_pixel(*b, size));
            let center = PixelPoint::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0);
            (Primitive::Rect { layer, a, b }, center)
        }
        ShapeDescriptor::Circle { center, radius } => {
            let center = to_pixel(*center, size);
            let radius = radius_to_pixels(*radius, size);
            (Primitive::Circle { layer, center, radius }, center)
        }
        ShapeDescriptor::Triangle { points } => ring(points, size),
        ShapeDescriptor::Polygon { points } => ring(points, size),
    }
}

fn ring(points: &[crate::Point], size: crate::CanvasSize) -> (Primitive, PixelPoint) {
    let pixels: Vec<_> = points.iter().map(|point| to_pixel(*point, size)).collect();
    let anchor = vertex_centroid(&pixels).unwrap_or_default();
    (
        Primitive::Path {
            layer: Layer::Committed,
            points: pixels,
            closed: true,
        },
        anchor,
    )
}

fn preview_primitives(preview: Preview, out: &mut Vec<Primitive>) {
    let layer = Layer::Preview;
    match preview {
        Preview::Rect { a, b } => out.push(Primitive::Rect { layer, a, b }),
        Preview::Circle { center, radius } => out.push(Primitive::Circle {
            layer,
            center,
            radius,
        }),
        Preview::Path {
            points,
            closed,
            hover,
            closable,
        } => {
            for point in &points {
                out.push(Primitive::Marker {
                    center: *point,
                    radius: PIN_RADIUS_PX,
                    highlight: false,
                });
            }
            if closable {
                if let Some(first) = points.first() {
                    out.push(Primitive::Marker {
                        center: *first,
                        radius: PIN_RADIUS_PX * 2.0,
                        highlight: true,
                    });
                }
            }
            let mut path = points;
            if let (false, Some(hover)) = (closed, hover) {
                path.push(hover);
            }
            if path.len() >= 2 {
                out.push(Primitive::Path {
                    layer,
                    points: path,
                    closed,
                });
            }
        }
    }
}

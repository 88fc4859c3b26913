use crate::{CanvasSize, PixelPoint, Point};

/// Drags shorter than this are treated as accidental clicks.
pub const MIN_DRAG_PX: f64 = 6.0;
/// Distance from the first polygon pin that counts as closing the shape.
pub const CLOSE_TOLERANCE_PX: f64 = 10.0;

/// Converts a canvas pixel position to unit space, clamping to [0, 1].
pub fn to_unit(pixel: PixelPoint, size: CanvasSize) -> Point {
    if !size.is_drawable() {
        return Point::default();
    }
    Point {
        x: pixel.x / size.width,
        y: pixel.y / size.height,
    }
    .clamp()
}

/// Keeps a pointer position inside the canvas rectangle.
pub fn clamp_to_canvas(pixel: PixelPoint, size: CanvasSize) -> PixelPoint {
    PixelPoint {
        x: pixel.x.clamp(0.0, size.width.max(0.0)),
        y: pixel.y.clamp(0.0, size.height.max(0.0)),
    }
}

/// Converts a unit point back to pixels. Not clamped: a canvas that shrank
/// since the shape was recorded may put it out of bounds.
pub fn to_pixel(point: Point, size: CanvasSize) -> PixelPoint {
    PixelPoint {
        x: point.x * size.width,
        y: point.y * size.height,
    }
}

pub fn radius_to_unit(radius_px: f64, size: CanvasSize) -> f64 {
    let side = size.min_side();
    if side <= 0.0 {
        return 0.0;
    }
    radius_px / side
}

pub fn radius_to_pixels(radius: f64, size: CanvasSize) -> f64 {
    radius * size.min_side()
}

/// Moves a pixel position recorded on one canvas size to the same relative
/// spot on another.
pub fn rescale(pixel: PixelPoint, from: CanvasSize, to: CanvasSize) -> PixelPoint {
    if !from.is_drawable() {
        return pixel;
    }
    PixelPoint {
        x: pixel.x * to.width / from.width,
        y: pixel.y * to.height / from.height,
    }
}

pub fn distance(a: PixelPoint, b: PixelPoint) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}

pub fn near(a: PixelPoint, b: PixelPoint, tolerance: f64) -> bool {
    distance(a, b) <= tolerance
}

/// Area of a closed ring by the shoelace formula.
pub fn shoelace_area(points: &[PixelPoint]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice = 0.0;
    for (index, current) in points.iter().enumerate() {
        let next = points[(index + 1) % points.len()];
        twice += current.x * next.y - next.x * current.y;
    }
    twice.abs() / 2.0
}

/// Lengths of every edge of a closed ring, including the closing edge.
pub fn ring_edges(points: &[PixelPoint]) -> Vec<f64> {
    if points.len() < 2 {
        return Vec::new();
    }
    (0..points.len())
        .map(|index| distance(points[index], points[(index + 1) % points.len()]))
        .collect()
}

pub fn vertex_centroid(points: &[PixelPoint]) -> Option<PixelPoint> {
    if points.is_empty() {
        return None;
    }
    let count = points.len() as f64;
    let (sum_x, sum_y) = points
        .iter()
        .fold((0.0, 0.0), |(x, y), point| (x + point.x, y + point.y));
    Some(PixelPoint {
        x: sum_x / count,
        y: sum_y / count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANVAS: CanvasSize = CanvasSize {
        width: 800.0,
        height: 400.0,
    };

    #[test]
    fn pointer_outside_canvas_is_pinned_to_its_edge() {
        assert_eq!(
            clamp_to_canvas(PixelPoint::new(-30.0, 250.0), CANVAS),
            PixelPoint::new(0.0, 250.0)
        );
        assert_eq!(
            clamp_to_canvas(PixelPoint::new(900.0, 410.0), CANVAS),
            PixelPoint::new(800.0, 400.0)
        );
        let inside = PixelPoint::new(12.5, 7.0);
        assert_eq!(clamp_to_canvas(inside, CANVAS), inside);
    }

    #[test]
    fn to_unit_divides_by_each_axis() {
        let point = to_unit(PixelPoint::new(200.0, 100.0), CANVAS);
        assert_eq!(point, Point::new(0.25, 0.25));
    }

    #[test]
    fn to_unit_clamps_outside_positions() {
        let point = to_unit(PixelPoint::new(-20.0, 900.0), CANVAS);
        assert_eq!(point, Point::new(0.0, 1.0));
    }

    #[test]
    fn to_unit_on_empty_canvas_is_origin() {
        let point = to_unit(PixelPoint::new(5.0, 5.0), CanvasSize::default());
        assert_eq!(point, Point::default());
    }

    #[test]
    fn to_pixel_is_not_clamped() {
        let shrunk = CanvasSize::new(100.0, 100.0);
        let pixel = to_pixel(Point::new(1.0, 1.0), shrunk);
        assert_eq!(pixel, PixelPoint::new(100.0, 100.0));
        let wide = to_pixel(Point::new(0.5, 0.5), CANVAS);
        assert_eq!(wide, PixelPoint::new(400.0, 200.0));
    }

    #[test]
    fn radius_uses_shorter_side() {
        let unit = radius_to_unit(100.0, CANVAS);
        assert!((unit - 0.25).abs() < 1e-12);
        let wider = CanvasSize::new(1600.0, 400.0);
        assert!((radius_to_pixels(unit, wider) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn shoelace_of_unit_square_is_one() {
        let square = [
            PixelPoint::new(0.0, 0.0),
            PixelPoint::new(1.0, 0.0),
            PixelPoint::new(1.0, 1.0),
            PixelPoint::new(0.0, 1.0),
        ];
        assert!((shoelace_area(&square) - 1.0).abs() < 1e-12);
        let reversed: Vec<_> = square.iter().rev().copied().collect();
        assert!((shoelace_area(&reversed) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn ring_edges_include_closing_edge() {
        let triangle = [
            PixelPoint::new(0.0, 0.0),
            PixelPoint::new(3.0, 0.0),
            PixelPoint::new(0.0, 4.0),
        ];
        assert_eq!(ring_edges(&triangle), vec![3.0, 5.0, 4.0]);
    }

    #[test]
    fn rescale_keeps_relative_position() {
        let moved = rescale(
            PixelPoint::new(400.0, 200.0),
            CANVAS,
            CanvasSize::new(400.0, 400.0),
        );
        assert_eq!(moved, PixelPoint::new(200.0, 200.0));
    }
}

use blueprint_shared::area::{self, heron_area, rectangle_area};
use blueprint_shared::geometry::{to_pixel, to_unit};
use blueprint_shared::{
    CanvasSize, Ledger, Measurement, Mode, PixelPoint, Point, ShapeDescriptor,
};
use proptest::prelude::*;

fn length() -> impl Strategy<Value = f64> {
    0.1f64..500.0
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

fn rect_shape() -> ShapeDescriptor {
    ShapeDescriptor::Rect {
        a: Point::new(0.2, 0.2),
        b: Point::new(0.6, 0.7),
    }
}

proptest! {
    #[test]
    fn rectangle_area_is_width_times_height(width in length(), height in length()) {
        prop_assert_eq!(rectangle_area(width, height).unwrap(), width * height);
    }

    #[test]
    fn heron_matches_right_triangle(a in length(), b in length()) {
        let c = a.hypot(b);
        let area = heron_area(a, b, c).unwrap();
        prop_assert!((area - 0.5 * a * b).abs() <= 1e-6 * (0.5 * a * b).max(1.0));
    }

    #[test]
    fn non_positive_lengths_are_rejected(width in -500.0f64..=0.0, height in length()) {
        let measurement = Measurement::Rect { width, height };
        prop_assert!(area::area_sq_ft(&measurement).is_err());
    }

    #[test]
    fn undo_then_readd_restores_total(
        widths in prop::collection::vec(length(), 1..8),
        height in length(),
    ) {
        let mut ledger = Ledger::new();
        for width in &widths {
            ledger.append(rect_shape(), Measurement::Rect { width: *width, height }, None).unwrap();
        }
        let before = ledger.total();
        let removed = ledger.undo().unwrap();
        ledger.append(removed.shape, removed.measurement, Some(removed.label.as_str())).unwrap();
        prop_assert!(close(ledger.total(), before));
    }

    #[test]
    fn clear_leaves_nothing(widths in prop::collection::vec(length(), 0..8)) {
        let mut ledger = Ledger::new();
        for width in &widths {
            ledger.append(rect_shape(), Measurement::Rect { width: *width, height: 2.0 }, None).unwrap();
        }
        ledger.clear();
        prop_assert_eq!(ledger.total(), 0.0);
        prop_assert_eq!(ledger.snapshot().selections_count, 0);
    }

    #[test]
    fn export_then_import_keeps_snapshot(
        radii in prop::collection::vec(length(), 0..6),
        mode_index in 0usize..4,
    ) {
        let mut ledger = Ledger::new();
        for radius in &radii {
            let shape = ShapeDescriptor::Circle { center: Point::new(0.5, 0.5), radius: 0.1 };
            ledger.append(shape, Measurement::Circle { radius: *radius }, Some("Round")).unwrap();
        }
        let mode = Mode::ALL[mode_index];
        let exported = ledger.export_state(mode, None);

        let mut restored = Ledger::new();
        let file = restored.import_state(&exported.to_json()).unwrap();
        prop_assert_eq!(file.mode, mode);
        prop_assert_eq!(restored.snapshot(), ledger.snapshot());
    }

    #[test]
    fn normalized_points_stay_in_unit_square(
        x in -2000.0f64..4000.0,
        y in -2000.0f64..4000.0,
        width in 1.0f64..3000.0,
        height in 1.0f64..3000.0,
    ) {
        let point = to_unit(PixelPoint::new(x, y), CanvasSize::new(width, height));
        prop_assert!((0.0..=1.0).contains(&point.x));
        prop_assert!((0.0..=1.0).contains(&point.y));
    }

    #[test]
    fn in_bounds_pixels_round_trip(
        fx in 0.0f64..=1.0,
        fy in 0.0f64..=1.0,
        width in 1.0f64..3000.0,
        height in 1.0f64..3000.0,
    ) {
        let size = CanvasSize::new(width, height);
        let pixel = PixelPoint::new(fx * width, fy * height);
        let back = to_pixel(to_unit(pixel, size), size);
        prop_assert!((back.x - pixel.x).abs() < 1e-6);
        prop_assert!((back.y - pixel.y).abs() < 1e-6);
    }
}

use web_sys::CanvasRenderingContext2d;

use blueprint_shared::scene::{self, Layer, Primitive};
use blueprint_shared::PixelPoint;

use crate::state::State;

const COMMITTED_STROKE: &str = "rgba(32, 96, 200, 0.95)";
const COMMITTED_FILL: &str = "rgba(32, 96, 200, 0.18)";
const PREVIEW_STROKE: &str = "rgba(228, 107, 73, 0.95)";
const PREVIEW_FILL: &str = "rgba(228, 107, 73, 0.12)";

fn layer_style(ctx: &CanvasRenderingContext2d, layer: Layer) {
    ctx.set_line_width(2.0);
    match layer {
        Layer::Committed => {
            ctx.set_stroke_style_str(COMMITTED_STROKE);
            ctx.set_fill_style_str(COMMITTED_FILL);
            let _ = ctx.set_line_dash(&js_sys::Array::new());
        }
        Layer::Preview => {
            ctx.set_stroke_style_str(PREVIEW_STROKE);
            ctx.set_fill_style_str(PREVIEW_FILL);
            let _ = ctx.set_line_dash(&js_sys::Array::of2(&6.into(), &4.into()));
        }
    }
}

fn trace_path(ctx: &CanvasRenderingContext2d, points: &[PixelPoint], closed: bool) {
    ctx.begin_path();
    for (index, point) in points.iter().enumerate() {
        if index == 0 {
            ctx.move_to(point.x, point.y);
        } else {
            ctx.line_to(point.x, point.y);
        }
    }
    if closed {
        ctx.close_path();
    }
}

fn draw_label(ctx: &CanvasRenderingContext2d, position: PixelPoint, text: &str) {
    ctx.set_font("600 13px system-ui, sans-serif");
    ctx.set_text_align("center");
    ctx.set_text_baseline("middle");
    ctx.set_line_width(3.0);
    ctx.set_stroke_style_str("rgba(255, 255, 255, 0.9)");
    let _ = ctx.stroke_text(text, position.x, position.y);
    ctx.set_fill_style_str("#1a1f2a");
    let _ = ctx.fill_text(text, position.x, position.y);
}

pub fn draw_primitive(ctx: &CanvasRenderingContext2d, primitive: &Primitive) {
    match primitive {
        Primitive::Rect { layer, a, b } => {
            layer_style(ctx, *layer);
            let (left, top) = (a.x.min(b.x), a.y.min(b.y));
            let (width, height) = ((b.x - a.x).abs(), (b.y - a.y).abs());
            ctx.fill_rect(left, top, width, height);
            ctx.stroke_rect(left, top, width, height);
        }
        Primitive::Circle {
            layer,
            center,
            radius,
        } => {
            layer_style(ctx, *layer);
            ctx.begin_path();
            let _ = ctx.arc(center.x, center.y, *radius, 0.0, std::f64::consts::PI * 2.0);
            ctx.fill();
            ctx.stroke();
        }
        Primitive::Path {
            layer,
            points,
            closed,
        } => {
            layer_style(ctx, *layer);
            trace_path(ctx, points, *closed);
            if *closed {
                ctx.fill();
            }
            ctx.stroke();
        }
        Primitive::Marker {
            center,
            radius,
            highlight,
        } => {
            let _ = ctx.set_line_dash(&js_sys::Array::new());
            ctx.begin_path();
            let _ = ctx.arc(center.x, center.y, *radius, 0.0, std::f64::consts::PI * 2.0);
            if *highlight {
                ctx.set_stroke_style_str(PREVIEW_STROKE);
                ctx.stroke();
            } else {
                ctx.set_fill_style_str(PREVIEW_STROKE);
                ctx.fill();
            }
        }
        Primitive::Text { position, text } => draw_label(ctx, *position, text),
    }
}

pub fn redraw(state: &State) {
    let size = state.estimator.size();
    let ctx = &state.ctx;
    ctx.clear_rect(0.0, 0.0, size.width, size.height);
    if let Some(image) = &state.image {
        let _ = ctx.draw_image_with_html_image_element_and_dw_and_dh(
            image,
            0.0,
            0.0,
            size.width,
            size.height,
        );
    }
    ctx.save();
    for primitive in scene::build(&state.estimator) {
        draw_primitive(ctx, &primitive);
    }
    ctx.restore();
}

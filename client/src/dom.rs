use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement, MouseEvent, Window};

use blueprint_shared::geometry::clamp_to_canvas;
use blueprint_shared::{CanvasSize, Mode, PixelPoint};

use crate::render::redraw;
use crate::state::State;

pub fn get_element<T: JsCast>(document: &Document, id: &str) -> Result<T, JsValue> {
    let element = document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("Missing element: {id}")))?;
    element
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("Invalid element type: {id}")))
}

pub fn set_pressed(element: &Element, active: bool) {
    let pressed = if active { "true" } else { "false" };
    let _ = element.set_attribute("aria-pressed", pressed);
}

pub fn set_hidden(element: &Element, hidden: bool) {
    if hidden {
        let _ = element.set_attribute("hidden", "");
    } else {
        let _ = element.remove_attribute("hidden");
    }
}

pub fn set_busy(element: &Element, busy: bool) {
    let value = if busy { "true" } else { "false" };
    let _ = element.set_attribute("aria-busy", value);
}

/// Marks the button whose `data-mode` matches and sets the canvas cursor.
pub fn sync_mode_buttons(document: &Document, state: &State) {
    let mode = state.estimator.mode();
    for candidate in Mode::ALL {
        let selector = format!("[data-mode=\"{}\"]", candidate.as_str());
        if let Ok(Some(button)) = document.query_selector(&selector) {
            set_pressed(&button, candidate == mode);
        }
    }
    let cursor = if state.estimator.is_awaiting() {
        "wait"
    } else {
        "crosshair"
    };
    if let Ok(element) = state.canvas.clone().dyn_into::<HtmlElement>() {
        let _ = element.style().set_property("cursor", cursor);
    }
}

pub fn set_status(status: &Element, text: &str) {
    status.set_text_content(Some(text));
}

pub fn alert(window: &Window, message: &str) {
    let _ = window.alert_with_message(message);
}

pub fn resize_canvas(window: &Window, state: &mut State) {
    let rect = state.canvas.get_bounding_client_rect();
    let dpr = window.device_pixel_ratio();
    state.canvas.set_width((rect.width() * dpr) as u32);
    state.canvas.set_height((rect.height() * dpr) as u32);
    let _ = state.ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0);
    if state.debug {
        let previous = state.estimator.size();
        web_sys::console::log_1(
            &format!(
                "Resizing canvas from {}x{} to {}x{}",
                previous.width,
                previous.height,
                rect.width(),
                rect.height()
            )
            .into(),
        );
    }
    state
        .estimator
        .resize(CanvasSize::new(rect.width(), rect.height()));
    redraw(state);
}

/// Pointer position in CSS pixels relative to the canvas, clamped to its
/// bounds so captured drags that leave the canvas stay on its edge.
pub fn event_to_pixel(state: &State, event: &MouseEvent) -> Option<PixelPoint> {
    let rect = state.canvas.get_bounding_client_rect();
    if rect.width() <= 0.0 || rect.height() <= 0.0 {
        return None;
    }
    Some(clamp_to_canvas(
        PixelPoint::new(
            event.client_x() as f64 - rect.left(),
            event.client_y() as f64 - rect.top(),
        ),
        CanvasSize::new(rect.width(), rect.height()),
    ))
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

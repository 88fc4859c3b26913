use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Event, File, FileReader, HtmlImageElement, ProgressEvent, Window};

use blueprint_shared::project_file::validate_image;
use blueprint_shared::Blueprint;

use crate::dom::alert;
use crate::render::redraw;
use crate::state::State;

/// Decodes a data URL into an image element and installs it as the
/// blueprint once it has loaded.
pub fn show_data_url(state: &Rc<RefCell<State>>, window: &Window, data_url: String) {
    let image = match HtmlImageElement::new() {
        Ok(image) => image,
        Err(_) => return,
    };
    let onload_state = state.clone();
    let onload_image = image.clone();
    let onload_url = data_url.clone();
    let onload = Closure::<dyn FnMut(Event)>::new(move |_| {
        let mut state = onload_state.borrow_mut();
        state.loading_image = false;
        state.image = Some(onload_image.clone());
        state.estimator.set_blueprint(Blueprint {
            data_url: Some(onload_url.clone()),
        });
        redraw(&state);
    });
    let onerror_state = state.clone();
    let onerror_window = window.clone();
    let onerror = Closure::<dyn FnMut(Event)>::new(move |_| {
        onerror_state.borrow_mut().loading_image = false;
        alert(&onerror_window, "That image could not be displayed.");
    });
    image.set_onload(Some(onload.as_ref().unchecked_ref()));
    image.set_onerror(Some(onerror.as_ref().unchecked_ref()));
    onload.forget();
    onerror.forget();
    image.set_src(&data_url);
}

/// Validates and reads an uploaded floor plan. Rejected files leave the
/// current blueprint untouched.
pub fn load_file(state: &Rc<RefCell<State>>, window: &Window, file: File) {
    if state.borrow().loading_image {
        return;
    }
    if let Err(error) = validate_image(&file.type_(), file.size() as usize) {
        alert(window, &error.to_string());
        return;
    }
    let reader = match FileReader::new() {
        Ok(reader) => reader,
        Err(_) => return,
    };
    let onload_state = state.clone();
    let onload_window = window.clone();
    let onload = Closure::<dyn FnMut(ProgressEvent)>::new(move |event: ProgressEvent| {
        let data_url = event
            .target()
            .and_then(|target| target.dyn_into::<FileReader>().ok())
            .and_then(|reader| reader.result().ok())
            .and_then(|result| result.as_string());
        match data_url {
            Some(data_url) => show_data_url(&onload_state, &onload_window, data_url),
            None => {
                onload_state.borrow_mut().loading_image = false;
                alert(&onload_window, "That file could not be read.");
            }
        }
    });
    reader.set_onload(Some(onload.as_ref().unchecked_ref()));
    onload.forget();
    state.borrow_mut().loading_image = true;
    if reader.read_as_data_url(&file).is_err() {
        state.borrow_mut().loading_image = false;
        alert(window, "That file could not be read.");
    }
}

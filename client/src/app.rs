use std::cell::{Cell, RefCell};
use std::rc::Rc;

use js_sys::{ArrayBuffer, Reflect, Uint8Array};
use wasm_bindgen::convert::FromWasmAbi;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    CanvasRenderingContext2d, Document, Element, Event, EventTarget, FileReader,
    HtmlButtonElement, HtmlCanvasElement, HtmlElement, HtmlInputElement, KeyboardEvent,
    MouseEvent, PointerEvent, ProgressEvent, Window,
};

use blueprint_shared::accounts;
use blueprint_shared::capture::DiscardReason;
use blueprint_shared::chat::ChatRequest;
use blueprint_shared::projects::{ProjectError, ProjectStore};
use blueprint_shared::store::StoreError;
use blueprint_shared::units::format_sq_ft;
use blueprint_shared::{CaptureEvent, Effect, Key, Mode, ProjectFile, Response};

use crate::blueprint;
use crate::chat;
use crate::dialog::Dialog;
use crate::dom::{alert, event_to_pixel, get_element, resize_canvas, set_busy, set_status, sync_mode_buttons};
use crate::panels::{render_account, render_projects, render_selections};
use crate::persistence::{download_binary, download_json, parse_load_payload_bytes, LocalStore};
use crate::render::redraw;
use crate::state::State;

fn debug_enabled(window: &Window) -> bool {
    let search = window.location().search().ok().unwrap_or_default();
    search.contains("debug=1") || search.contains("debug=true")
}

fn document_ready_state(document: &Document) -> Option<String> {
    Reflect::get(document.as_ref(), &JsValue::from_str("readyState"))
        .ok()?
        .as_string()
}

/// Elements the handlers touch after startup.
#[derive(Clone)]
struct Ui {
    window: Window,
    document: Document,
    dialog: Dialog,
    status: Element,
    selection_list: Element,
    total: Element,
    project_list: Element,
    project_name: HtmlInputElement,
    account_label: Element,
    username: HtmlInputElement,
    password: HtmlInputElement,
    logout_button: HtmlButtonElement,
    chat_log: Element,
    chat_input: HtmlInputElement,
    chat_send: HtmlButtonElement,
}

impl Ui {
    fn refresh_selections(&self, state: &State) {
        render_selections(&self.selection_list, &self.total, &state.estimator);
    }

    fn refresh_projects(&self, state: &State) {
        let mut store = LocalStore::open(&self.window);
        let projects = ProjectStore::new(&mut store).list(&state.owner());
        render_projects(&self.project_list, &projects);
        render_account(&self.account_label, state.user.as_deref());
        self.logout_button.set_disabled(state.user.is_none());
    }

    fn refresh_all(&self, state: &State) {
        self.refresh_selections(state);
        self.refresh_projects(state);
        sync_mode_buttons(&self.document, state);
        redraw(state);
    }
}

fn now_ms() -> u64 {
    js_sys::Date::now() as u64
}

fn listen<E: FromWasmAbi + 'static>(
    target: &EventTarget,
    event: &str,
    handler: impl FnMut(E) + 'static,
) -> Result<(), JsValue> {
    let closure = Closure::<dyn FnMut(E)>::new(handler);
    target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

fn data_attribute(event: &Event, name: &str) -> Option<(Element, String)> {
    let target: Element = event.target()?.dyn_into().ok()?;
    let element = target.closest(&format!("[{name}]")).ok()??;
    let value = element.get_attribute(name)?;
    Some((element, value))
}

fn apply_effect(ui: &Ui, state: &mut State, effect: Effect) {
    if state.debug {
        web_sys::console::log_1(&format!("effect {effect:?}").into());
    }
    match effect {
        Effect::Redraw => {}
        Effect::Prompt(request) => ui.dialog.show(&request, None),
        Effect::Reprompt { reason, request } => ui.dialog.show(&request, Some(reason.as_str())),
        Effect::Committed(selection) => {
            ui.dialog.hide();
            set_status(
                &ui.status,
                &format!(
                    "Added {}: {} sq ft",
                    selection.label,
                    format_sq_ft(selection.area_sq_ft)
                ),
            );
            ui.refresh_selections(state);
        }
        Effect::Discarded(reason) => {
            ui.dialog.hide();
            let text = match reason {
                DiscardReason::TooSmall => "Drag a little further to draw a shape.",
                DiscardReason::Cancelled => "Shape discarded.",
                DiscardReason::ModeChanged => "Unfinished shape discarded.",
            };
            set_status(&ui.status, text);
        }
        Effect::Rejected(message) => {
            ui.dialog.hide();
            set_status(&ui.status, "Shape discarded.");
            alert(&ui.window, &format!("Those measurements do not work: {message}"));
        }
    }
    sync_mode_buttons(&ui.document, state);
    redraw(state);
}

fn handle_capture(ui: &Ui, state: &Rc<RefCell<State>>, event: CaptureEvent) {
    let mut state = state.borrow_mut();
    let effect = state.estimator.handle(event);
    apply_effect(ui, &mut state, effect);
}

/// Installs a loaded project: ledger, mode and, when present, the image.
fn adopt_project(ui: &Ui, state: &Rc<RefCell<State>>, file: ProjectFile) {
    let data_url = file.blueprint.as_ref().and_then(|blueprint| blueprint.data_url.clone());
    let image_dropped = file.blueprint.is_some() && data_url.is_none();
    {
        let mut state = state.borrow_mut();
        state.estimator.import_file(file);
        if !image_dropped {
            state.image = None;
        }
        ui.dialog.hide();
        set_status(
            &ui.status,
            &format!(
                "Loaded {} area(s), {} sq ft.",
                state.estimator.ledger().len(),
                format_sq_ft(state.estimator.total())
            ),
        );
        ui.refresh_all(&state);
    }
    if let Some(data_url) = data_url {
        blueprint::show_data_url(state, &ui.window, data_url);
    } else if image_dropped {
        alert(
            &ui.window,
            "This project was saved without its blueprint image. Upload the image again.",
        );
    }
}

fn warn_if_image_dropped(ui: &Ui, dropped: bool) {
    if dropped {
        alert(
            &ui.window,
            "The blueprint image is too large to save and was left out. Your shapes are saved.",
        );
    }
}

#[wasm_bindgen(start)]
pub fn run() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("Missing window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("Missing document"))?;
    let started = Rc::new(Cell::new(false));

    if document_ready_state(&document).as_deref() == Some("complete") {
        started.set(true);
        return start_app();
    }

    let onload_started = started.clone();
    let onload = Closure::<dyn FnMut(Event)>::new(move |_| {
        if onload_started.replace(true) {
            return;
        }
        if let Err(err) = start_app() {
            web_sys::console::error_1(&err);
        }
    });
    window.add_event_listener_with_callback("load", onload.as_ref().unchecked_ref())?;
    onload.forget();

    Ok(())
}

fn start_app() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("Missing window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("Missing document"))?;
    let debug = debug_enabled(&window);
    if debug {
        web_sys::console::log_1(&"Estimator debug logging enabled".into());
    }

    let canvas: HtmlCanvasElement = get_element(&document, "board")?;
    let ctx = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("Missing 2d context"))?
        .dyn_into::<CanvasRenderingContext2d>()?;

    let mode_bar: HtmlElement = get_element(&document, "modes")?;
    let undo_button: HtmlButtonElement = get_element(&document, "undo")?;
    let clear_button: HtmlButtonElement = get_element(&document, "clear")?;
    let image_button: HtmlButtonElement = get_element(&document, "image-upload")?;
    let image_file: HtmlInputElement = get_element(&document, "image-file")?;
    let image_clear: HtmlButtonElement = get_element(&document, "image-clear")?;
    let save_json_button: HtmlButtonElement = get_element(&document, "save-json")?;
    let save_binary_button: HtmlButtonElement = get_element(&document, "save-binary")?;
    let load_button: HtmlButtonElement = get_element(&document, "load")?;
    let load_file: HtmlInputElement = get_element(&document, "load-file")?;
    let prompt_form: HtmlElement = get_element(&document, "prompt-form")?;
    let prompt_cancel: HtmlButtonElement = get_element(&document, "prompt-cancel")?;
    let register_button: HtmlButtonElement = get_element(&document, "register")?;
    let login_button: HtmlButtonElement = get_element(&document, "login")?;
    let save_project_button: HtmlButtonElement = get_element(&document, "save-project")?;
    let chat_form: HtmlElement = get_element(&document, "chat-form")?;

    let ui = Ui {
        window: window.clone(),
        document: document.clone(),
        dialog: Dialog::new(&document)?,
        status: get_element(&document, "status")?,
        selection_list: get_element(&document, "selections")?,
        total: get_element(&document, "total")?,
        project_list: get_element(&document, "projects")?,
        project_name: get_element(&document, "project-name")?,
        account_label: get_element(&document, "account")?,
        username: get_element(&document, "username")?,
        password: get_element(&document, "password")?,
        logout_button: get_element(&document, "logout")?,
        chat_log: get_element(&document, "chat-log")?,
        chat_input: get_element(&document, "chat-input")?,
        chat_send: get_element(&document, "chat-send")?,
    };

    let user = accounts::current_user(&LocalStore::open(&window));
    let state = Rc::new(RefCell::new(State::new(canvas.clone(), ctx, user, debug)));

    {
        let resize_state = state.clone();
        let window_cb = window.clone();
        listen(window.as_ref(), "resize", move |_: Event| {
            let mut state = resize_state.borrow_mut();
            resize_canvas(&window_cb, &mut state);
        })?;
    }

    {
        let down_state = state.clone();
        let down_ui = ui.clone();
        let down_canvas = canvas.clone();
        listen(canvas.as_ref(), "pointerdown", move |event: PointerEvent| {
            if down_ui.dialog.is_open() || event.button() != 0 {
                return;
            }
            let Some(point) = event_to_pixel(&down_state.borrow(), &event) else {
                return;
            };
            let _ = down_canvas.set_pointer_capture(event.pointer_id());
            handle_capture(&down_ui, &down_state, CaptureEvent::PointerDown(point));
        })?;
    }

    {
        let move_state = state.clone();
        let move_ui = ui.clone();
        listen(canvas.as_ref(), "pointermove", move |event: PointerEvent| {
            let Some(point) = event_to_pixel(&move_state.borrow(), &event) else {
                return;
            };
            handle_capture(&move_ui, &move_state, CaptureEvent::PointerMove(point));
        })?;
    }

    {
        let up_state = state.clone();
        let up_ui = ui.clone();
        let up_canvas = canvas.clone();
        listen(canvas.as_ref(), "pointerup", move |event: PointerEvent| {
            let _ = up_canvas.release_pointer_capture(event.pointer_id());
            let Some(point) = event_to_pixel(&up_state.borrow(), &event) else {
                return;
            };
            handle_capture(&up_ui, &up_state, CaptureEvent::PointerUp(point));
        })?;
    }

    {
        let click_state = state.clone();
        let click_ui = ui.clone();
        listen(canvas.as_ref(), "click", move |event: MouseEvent| {
            let Some(point) = event_to_pixel(&click_state.borrow(), &event) else {
                return;
            };
            handle_capture(&click_ui, &click_state, CaptureEvent::Click(point));
        })?;
    }

    {
        let dbl_state = state.clone();
        let dbl_ui = ui.clone();
        listen(canvas.as_ref(), "dblclick", move |event: MouseEvent| {
            event.prevent_default();
            let Some(point) = event_to_pixel(&dbl_state.borrow(), &event) else {
                return;
            };
            handle_capture(&dbl_ui, &dbl_state, CaptureEvent::DoubleClick(point));
        })?;
    }

    {
        let key_state = state.clone();
        let key_ui = ui.clone();
        listen(window.as_ref(), "keydown", move |event: KeyboardEvent| {
            let key = Key::from_name(&event.key());
            if key == Key::Other {
                return;
            }
            // Enter inside the dialog submits its form.
            if key_ui.dialog.is_open() {
                if key != Key::Escape {
                    return;
                }
            } else if event
                .target()
                .and_then(|target| target.dyn_into::<HtmlInputElement>().ok())
                .is_some()
            {
                return;
            }
            event.prevent_default();
            handle_capture(&key_ui, &key_state, CaptureEvent::KeyDown(key));
        })?;
    }

    {
        let mode_state = state.clone();
        let mode_ui = ui.clone();
        listen(mode_bar.as_ref(), "click", move |event: Event| {
            let Some(mode) = data_attribute(&event, "data-mode").and_then(|(_, value)| Mode::parse(&value))
            else {
                return;
            };
            let mut state = mode_state.borrow_mut();
            let effect = state.estimator.set_mode(mode);
            apply_effect(&mode_ui, &mut state, effect);
        })?;
    }

    {
        let submit_state = state.clone();
        let submit_ui = ui.clone();
        listen(prompt_form.as_ref(), "submit", move |event: Event| {
            event.prevent_default();
            let mut state = submit_state.borrow_mut();
            let Some(request) = state.estimator.pending_request() else {
                submit_ui.dialog.hide();
                return;
            };
            match submit_ui.dialog.read(&request) {
                Ok(response) => {
                    let effect = state.estimator.respond(response);
                    apply_effect(&submit_ui, &mut state, effect);
                }
                Err(message) => submit_ui.dialog.show_reason(Some(message.as_str())),
            }
        })?;
    }

    {
        let cancel_state = state.clone();
        let cancel_ui = ui.clone();
        listen(prompt_cancel.as_ref(), "click", move |_: Event| {
            let mut state = cancel_state.borrow_mut();
            let effect = state.estimator.respond(Response::Cancel);
            apply_effect(&cancel_ui, &mut state, effect);
        })?;
    }

    {
        let undo_state = state.clone();
        let undo_ui = ui.clone();
        listen(undo_button.as_ref(), "click", move |_: Event| {
            let mut state = undo_state.borrow_mut();
            if let Some(selection) = state.estimator.undo() {
                set_status(&undo_ui.status, &format!("Removed {}.", selection.label));
            }
            undo_ui.refresh_selections(&state);
            redraw(&state);
        })?;
    }

    {
        let clear_state = state.clone();
        let clear_ui = ui.clone();
        listen(clear_button.as_ref(), "click", move |_: Event| {
            if clear_state.borrow().estimator.ledger().is_empty() {
                return;
            }
            let confirmed = clear_ui
                .window
                .confirm_with_message("Remove every measured area?")
                .unwrap_or(false);
            if !confirmed {
                return;
            }
            let mut state = clear_state.borrow_mut();
            state.estimator.clear();
            set_status(&clear_ui.status, "All areas cleared.");
            clear_ui.refresh_selections(&state);
            redraw(&state);
        })?;
    }

    {
        let remove_state = state.clone();
        let remove_ui = ui.clone();
        let list: &EventTarget = ui.selection_list.as_ref();
        listen(list, "click", move |event: Event| {
            let Some((element, id)) = data_attribute(&event, "data-id") else {
                return;
            };
            if element.get_attribute("data-action").as_deref() != Some("remove") {
                return;
            }
            let mut state = remove_state.borrow_mut();
            if let Some(selection) = state.estimator.remove(&id) {
                set_status(&remove_ui.status, &format!("Removed {}.", selection.label));
            }
            remove_ui.refresh_selections(&state);
            redraw(&state);
        })?;
    }

    {
        let image_file = image_file.clone();
        listen(image_button.as_ref(), "click", move |_: Event| {
            image_file.set_value("");
            image_file.click();
        })?;
    }

    {
        let image_state = state.clone();
        let image_window = window.clone();
        let image_input = image_file.clone();
        listen(image_file.as_ref(), "change", move |_: Event| {
            let Some(file) = image_input.files().and_then(|list| list.get(0)) else {
                return;
            };
            blueprint::load_file(&image_state, &image_window, file);
        })?;
    }

    {
        let image_state = state.clone();
        listen(image_clear.as_ref(), "click", move |_: Event| {
            let mut state = image_state.borrow_mut();
            state.image = None;
            state.estimator.clear_blueprint();
            redraw(&state);
        })?;
    }

    {
        let save_state = state.clone();
        let save_ui = ui.clone();
        listen(save_json_button.as_ref(), "click", move |_: Event| {
            let exported = save_state.borrow().estimator.export_state();
            warn_if_image_dropped(&save_ui, exported.image_dropped);
            if let Err(error) = download_json(&save_ui.document, &exported.to_json(), "estimate.json") {
                web_sys::console::error_1(&error);
            }
        })?;
    }

    {
        let save_state = state.clone();
        let save_ui = ui.clone();
        listen(save_binary_button.as_ref(), "click", move |_: Event| {
            let exported = save_state.borrow().estimator.export_state();
            warn_if_image_dropped(&save_ui, exported.image_dropped);
            if let Err(error) = download_binary(&save_ui.document, &exported.file, "estimate.bpef") {
                web_sys::console::error_1(&error);
            }
        })?;
    }

    {
        let load_file = load_file.clone();
        listen(load_button.as_ref(), "click", move |_: Event| {
            load_file.set_value("");
            load_file.click();
        })?;
    }

    {
        let load_state = state.clone();
        let load_ui = ui.clone();
        let load_input = load_file.clone();
        let load_busy = load_button.clone();
        listen(load_file.as_ref(), "change", move |_: Event| {
            let Some(file) = load_input.files().and_then(|list| list.get(0)) else {
                return;
            };
            let Ok(reader) = FileReader::new() else {
                return;
            };
            let onload_state = load_state.clone();
            let onload_ui = load_ui.clone();
            let onload_busy = load_busy.clone();
            let onload = Closure::<dyn FnMut(ProgressEvent)>::new(move |event: ProgressEvent| {
                set_busy(&onload_busy, false);
                let bytes = event
                    .target()
                    .and_then(|target| target.dyn_into::<FileReader>().ok())
                    .and_then(|reader| reader.result().ok())
                    .and_then(|result| result.dyn_into::<ArrayBuffer>().ok())
                    .map(|buffer| Uint8Array::new(&buffer).to_vec());
                let Some(bytes) = bytes else {
                    alert(&onload_ui.window, "That file could not be read.");
                    return;
                };
                match parse_load_payload_bytes(&bytes) {
                    Ok(file) => adopt_project(&onload_ui, &onload_state, file),
                    Err(error) => alert(
                        &onload_ui.window,
                        &format!("That project could not be loaded: {error}"),
                    ),
                }
            });
            reader.set_onload(Some(onload.as_ref().unchecked_ref()));
            onload.forget();
            set_busy(&load_busy, true);
            if reader.read_as_array_buffer(&file).is_err() {
                set_busy(&load_busy, false);
            }
        })?;
    }

    {
        let register_state = state.clone();
        let register_ui = ui.clone();
        listen(register_button.as_ref(), "click", move |_: Event| {
            let mut store = LocalStore::open(&register_ui.window);
            match accounts::register(
                &mut store,
                &register_ui.username.value(),
                &register_ui.password.value(),
            ) {
                Ok(username) => {
                    register_ui.password.set_value("");
                    let mut state = register_state.borrow_mut();
                    state.user = Some(username);
                    register_ui.refresh_projects(&state);
                }
                Err(error) => alert(&register_ui.window, &error.to_string()),
            }
        })?;
    }

    {
        let login_state = state.clone();
        let login_ui = ui.clone();
        listen(login_button.as_ref(), "click", move |_: Event| {
            let mut store = LocalStore::open(&login_ui.window);
            match accounts::login(&mut store, &login_ui.username.value(), &login_ui.password.value()) {
                Ok(username) => {
                    login_ui.password.set_value("");
                    let mut state = login_state.borrow_mut();
                    state.user = Some(username);
                    login_ui.refresh_projects(&state);
                }
                Err(error) => alert(&login_ui.window, &error.to_string()),
            }
        })?;
    }

    {
        let logout_state = state.clone();
        let logout_ui = ui.clone();
        let logout_button = ui.logout_button.clone();
        listen(logout_button.as_ref(), "click", move |_: Event| {
            accounts::logout(&mut LocalStore::open(&logout_ui.window));
            let mut state = logout_state.borrow_mut();
            state.user = None;
            logout_ui.refresh_projects(&state);
        })?;
    }

    {
        let project_state = state.clone();
        let project_ui = ui.clone();
        listen(save_project_button.as_ref(), "click", move |_: Event| {
            let state = project_state.borrow();
            let exported = state.estimator.export_state();
            let mut store = LocalStore::open(&project_ui.window);
            let saved = ProjectStore::new(&mut store).save(
                &state.owner(),
                &project_ui.project_name.value(),
                exported.file,
                now_ms(),
            );
            match saved {
                Ok(project) => {
                    warn_if_image_dropped(&project_ui, exported.image_dropped);
                    set_status(&project_ui.status, &format!("Saved \"{}\".", project.name));
                    project_ui.refresh_projects(&state);
                }
                Err(ProjectError::Store(StoreError::QuotaExceeded)) => alert(
                    &project_ui.window,
                    "Browser storage is full. Delete an old project or remove the blueprint image, then save again.",
                ),
                Err(error) => alert(&project_ui.window, &error.to_string()),
            }
        })?;
    }

    {
        let list_state = state.clone();
        let list_ui = ui.clone();
        let list: &EventTarget = ui.project_list.as_ref();
        listen(list, "click", move |event: Event| {
            let Some((element, id)) = data_attribute(&event, "data-id") else {
                return;
            };
            let action = element.get_attribute("data-action").unwrap_or_default();
            let owner = list_state.borrow().owner();
            let mut store = LocalStore::open(&list_ui.window);
            let mut projects = ProjectStore::new(&mut store);
            match action.as_str() {
                "load" => {
                    let Some(project) = projects.load(&owner, &id) else {
                        alert(&list_ui.window, "That project is no longer available.");
                        return;
                    };
                    list_ui.project_name.set_value(&project.name);
                    adopt_project(&list_ui, &list_state, project.full_state);
                }
                "delete" => {
                    let confirmed = list_ui
                        .window
                        .confirm_with_message("Delete this saved project?")
                        .unwrap_or(false);
                    if !confirmed {
                        return;
                    }
                    if let Err(error) = projects.delete(&owner, &id) {
                        alert(&list_ui.window, &error.to_string());
                    }
                    list_ui.refresh_projects(&list_state.borrow());
                }
                _ => {}
            }
        })?;
    }

    {
        let chat_state = state.clone();
        let chat_ui = ui.clone();
        listen(chat_form.as_ref(), "submit", move |event: Event| {
            event.prevent_default();
            let request = {
                let mut state = chat_state.borrow_mut();
                if state.chat_busy {
                    return;
                }
                let request = ChatRequest::new(chat_ui.chat_input.value(), state.estimator.snapshot());
                if let Err(error) = request.validate() {
                    alert(&chat_ui.window, &error.to_string());
                    return;
                }
                state.chat_busy = true;
                request
            };
            chat::append_message(&chat_ui.document, &chat_ui.chat_log, "user", request.message.trim());
            chat_ui.chat_input.set_value("");
            chat_ui.chat_input.set_disabled(true);
            chat_ui.chat_send.set_disabled(true);
            let chat_state = chat_state.clone();
            let chat_ui = chat_ui.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let reply = chat::ask(&chat_ui.window, &request).await;
                chat::append_message(&chat_ui.document, &chat_ui.chat_log, "assistant", &reply);
                chat_state.borrow_mut().chat_busy = false;
                chat_ui.chat_input.set_disabled(false);
                chat_ui.chat_send.set_disabled(false);
                let _ = chat_ui.chat_input.focus();
            });
        })?;
    }

    {
        let mut state = state.borrow_mut();
        resize_canvas(&window, &mut state);
        ui.refresh_all(&state);
    }
    set_status(&ui.status, "Upload a floor plan, then drag out a rectangle to start.");

    Ok(())
}

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Document, Element, Headers, RequestInit, Response, Window};

use blueprint_shared::chat::{ChatErrorBody, ChatReply, ChatRequest, CHAT_PATH};

use crate::dom::escape_html;

pub const NO_REPLY: &str = "The assistant could not answer right now. Please try again.";

/// Posts the question and returns the reply text, or a message that is safe
/// to show in place of one.
pub async fn ask(window: &Window, request: &ChatRequest) -> String {
    match send(window, request).await {
        Ok(reply) => reply,
        Err(error) => {
            web_sys::console::warn_1(&error);
            error.as_string().unwrap_or_else(|| NO_REPLY.to_string())
        }
    }
}

async fn send(window: &Window, request: &ChatRequest) -> Result<String, JsValue> {
    let body = serde_json::to_string(request).map_err(|error| JsValue::from_str(&error.to_string()))?;
    let headers = Headers::new()?;
    headers.set("Content-Type", "application/json")?;
    let init = RequestInit::new();
    init.set_method("POST");
    init.set_headers(&headers);
    init.set_body(&JsValue::from_str(&body));

    let response: Response = JsFuture::from(window.fetch_with_str_and_init(CHAT_PATH, &init))
        .await?
        .dyn_into()?;
    let text = JsFuture::from(response.text()?)
        .await?
        .as_string()
        .unwrap_or_default();
    if response.ok() {
        let reply: ChatReply = serde_json::from_str(&text)
            .map_err(|_| JsValue::from_str(NO_REPLY))?;
        return Ok(reply.reply);
    }
    let message = serde_json::from_str::<ChatErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or_else(|_| NO_REPLY.to_string());
    Err(JsValue::from_str(&message))
}

pub fn append_message(document: &Document, log: &Element, role: &str, text: &str) {
    let Ok(item) = document.create_element("li") else {
        return;
    };
    item.set_class_name(&format!("chat-{role}"));
    item.set_inner_html(&escape_html(text));
    let _ = log.append_child(&item);
    log.set_scroll_top(log.scroll_height());
}

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Blob, BlobPropertyBag, Document, HtmlAnchorElement, Storage, Url, Window};

use blueprint_shared::project_file::{decode_project_file, encode_project_file, parse_json};
use blueprint_shared::store::{KeyValueStore, StoreError};
use blueprint_shared::{ImportError, ProjectFile};

/// `localStorage`, or nothing when the browser refuses access.
pub struct LocalStore {
    storage: Option<Storage>,
}

impl LocalStore {
    pub fn open(window: &Window) -> Self {
        Self {
            storage: window.local_storage().ok().flatten(),
        }
    }
}

impl KeyValueStore for LocalStore {
    fn get(&self, key: &str) -> Option<String> {
        self.storage.as_ref()?.get_item(key).ok().flatten()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let storage = self
            .storage
            .as_ref()
            .ok_or_else(|| StoreError::Unavailable("local storage is disabled".into()))?;
        // Browsers only throw here for QuotaExceededError.
        storage
            .set_item(key, value)
            .map_err(|_| StoreError::QuotaExceeded)
    }

    fn remove(&mut self, key: &str) {
        if let Some(storage) = self.storage.as_ref() {
            let _ = storage.remove_item(key);
        }
    }
}

pub fn parse_load_payload_bytes(bytes: &[u8]) -> Result<ProjectFile, ImportError> {
    if let Ok(file) = decode_project_file(bytes) {
        return Ok(file);
    }
    let Ok(text) = String::from_utf8(bytes.to_vec()) else {
        return Err(ImportError::InvalidBinary);
    };
    parse_load_payload_text(&text)
}

/// Accepts raw JSON, a `data:` URL wrapping JSON, or URI-encoded JSON.
pub fn parse_load_payload_text(text: &str) -> Result<ProjectFile, ImportError> {
    let first_error = match parse_json(text) {
        Ok(file) => return Ok(file),
        Err(error) => error,
    };
    let trimmed = text.trim();
    if let Some(payload) = extract_data_url_payload(trimmed) {
        if let Ok(file) = parse_json(&payload) {
            return Ok(file);
        }
        if let Some(decoded) = decode_uri_string(&payload) {
            if let Ok(file) = parse_json(&decoded) {
                return Ok(file);
            }
        }
    }
    if let Some(decoded) = decode_uri_string(trimmed) {
        if let Ok(file) = parse_json(&decoded) {
            return Ok(file);
        }
    }
    Err(first_error)
}

fn extract_data_url_payload(text: &str) -> Option<String> {
    let trimmed = text.trim_start();
    if !trimmed.starts_with("data:") {
        return None;
    }
    let (_, payload) = trimmed.split_once(',')?;
    Some(payload.to_string())
}

fn decode_uri_string(text: &str) -> Option<String> {
    js_sys::decode_uri_component(text)
        .ok()
        .and_then(|value| value.as_string())
}

fn click_download(document: &Document, href: &str, filename: &str) -> Result<(), JsValue> {
    let anchor: HtmlAnchorElement = document.create_element("a")?.dyn_into()?;
    anchor.set_href(href);
    anchor.set_download(filename);
    anchor.click();
    Ok(())
}

pub fn download_json(document: &Document, json: &str, filename: &str) -> Result<(), JsValue> {
    let encoded = js_sys::encode_uri_component(json);
    let href = format!("data:application/json;charset=utf-8,{encoded}");
    click_download(document, &href, filename)
}

pub fn download_binary(
    document: &Document,
    file: &ProjectFile,
    filename: &str,
) -> Result<(), JsValue> {
    let bytes = js_sys::Uint8Array::from(encode_project_file(file).as_slice());
    let parts = js_sys::Array::of1(&bytes);
    let options = BlobPropertyBag::new();
    options.set_type("application/octet-stream");
    let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &options)?;
    let url = Url::create_object_url_with_blob(&blob)?;
    let result = click_download(document, &url, filename);
    let _ = Url::revoke_object_url(&url);
    result
}

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlInputElement};

use blueprint_shared::capture::{Field, Unit};
use blueprint_shared::units::{format_feet, format_sq_ft, parse_length, parse_positive};
use blueprint_shared::{QuadMethod, Request, Response};

use crate::dom::{escape_html, get_element, set_hidden};

/// The modal that answers capture requests.
#[derive(Clone)]
pub struct Dialog {
    root: Element,
    title: Element,
    reason: Element,
    fields: Element,
}

fn default_text(field: &Field) -> String {
    let Some(value) = field.default else {
        return String::new();
    };
    match field.unit {
        Unit::Feet => {
            let text = format!("{value:.2}");
            text.trim_end_matches('0').trim_end_matches('.').to_string()
        }
        Unit::SquareFeet => format_sq_ft(value),
    }
}

fn input_html(name: &str, label: &str, value: &str, placeholder: &str) -> String {
    format!(
        "<label class=\"prompt-field\">{label}<input name=\"{name}\" value=\"{value}\" placeholder=\"{placeholder}\" autocomplete=\"off\" /></label>",
        label = escape_html(label),
        name = name,
        value = escape_html(value),
        placeholder = escape_html(placeholder),
    )
}

impl Dialog {
    pub fn new(document: &Document) -> Result<Self, JsValue> {
        Ok(Self {
            root: get_element(document, "prompt")?,
            title: get_element(document, "prompt-title")?,
            reason: get_element(document, "prompt-reason")?,
            fields: get_element(document, "prompt-fields")?,
        })
    }

    pub fn is_open(&self) -> bool {
        !self.root.has_attribute("hidden")
    }

    pub fn hide(&self) {
        set_hidden(&self.root, true);
        self.fields.set_inner_html("");
    }

    pub fn show(&self, request: &Request, reason: Option<&str>) {
        let (title, body) = match request {
            Request::Lengths { title, fields, .. } => {
                let body = fields
                    .iter()
                    .map(|field| {
                        let (unit, placeholder) = match field.unit {
                            Unit::Feet => ("ft", "e.g. 12' 6\" or 12.5"),
                            Unit::SquareFeet => ("sq ft", "e.g. 240"),
                        };
                        let label = format!("{} ({unit})", field.label);
                        input_html(field.name, &label, &default_text(field), placeholder)
                    })
                    .collect::<String>();
                (title.clone(), body)
            }
            Request::QuadMethod { edges } => {
                let sides = edges
                    .iter()
                    .map(|edge| format_feet(*edge))
                    .collect::<Vec<_>>()
                    .join(", ");
                let choices = [QuadMethod::Rectangle, QuadMethod::Trapezoid, QuadMethod::Irregular]
                    .iter()
                    .enumerate()
                    .map(|(index, method)| format!("{} = {}", index + 1, method.label()))
                    .collect::<Vec<_>>()
                    .join(", ");
                let body = format!(
                    "<p class=\"prompt-note\">Sides: {}</p>{}",
                    escape_html(&sides),
                    input_html("method", &format!("Measure as ({choices})"), "1", "1, 2 or 3")
                );
                ("Four-sided shape".to_string(), body)
            }
            Request::Label {
                default,
                area_sq_ft,
            } => {
                let body = format!(
                    "<p class=\"prompt-note\">Area: {} sq ft</p>{}",
                    format_sq_ft(*area_sq_ft),
                    input_html("label", "Name", "", default)
                );
                ("Name this area".to_string(), body)
            }
        };
        self.title.set_text_content(Some(&title));
        self.show_reason(reason);
        self.fields.set_inner_html(&body);
        set_hidden(&self.root, false);
        if let Some(first) = self.input_at(0) {
            let _ = first.focus();
            first.select();
        }
    }

    pub fn show_reason(&self, reason: Option<&str>) {
        match reason {
            Some(reason) => {
                self.reason.set_text_content(Some(reason));
                set_hidden(&self.reason, false);
            }
            None => {
                self.reason.set_text_content(None);
                set_hidden(&self.reason, true);
            }
        }
    }

    fn input_at(&self, index: u32) -> Option<HtmlInputElement> {
        self.fields
            .query_selector_all("input")
            .ok()?
            .item(index)?
            .dyn_into()
            .ok()
    }

    fn value(&self, name: &str) -> String {
        self.fields
            .query_selector(&format!("input[name=\"{name}\"]"))
            .ok()
            .flatten()
            .and_then(|element| element.dyn_into::<HtmlInputElement>().ok())
            .map(|input| input.value())
            .unwrap_or_default()
    }

    /// Reads the form as an answer to `request`. Input that does not parse
    /// comes back as a message to show without answering.
    pub fn read(&self, request: &Request) -> Result<Response, String> {
        match request {
            Request::Lengths { fields, .. } => {
                let mut values = Vec::with_capacity(fields.len());
                for field in fields {
                    let text = self.value(field.name);
                    let parsed = match field.unit {
                        Unit::Feet => parse_length(&text),
                        Unit::SquareFeet => parse_positive(&text),
                    };
                    values.push(parsed.map_err(|error| format!("{}: {error}", field.label))?);
                }
                Ok(Response::Values(values))
            }
            Request::QuadMethod { .. } => Ok(QuadMethod::from_choice(&self.value("method"))
                .map(Response::Method)
                .unwrap_or(Response::Cancel)),
            Request::Label { .. } => Ok(Response::Label(self.value("label"))),
        }
    }
}

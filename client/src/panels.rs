use web_sys::Element;

use blueprint_shared::projects::Project;
use blueprint_shared::units::format_sq_ft;
use blueprint_shared::Estimator;

use crate::dom::escape_html;

/// One row per selection with a remove button, plus the running total.
pub fn render_selections(list: &Element, total: &Element, estimator: &Estimator) {
    let rows = estimator
        .ledger()
        .selections()
        .iter()
        .map(|selection| {
            format!(
                "<li><span class=\"selection-label\">{label}</span> <span class=\"selection-kind\">{kind}</span> <span class=\"selection-area\">{area} sq ft</span> <button type=\"button\" data-action=\"remove\" data-id=\"{id}\" aria-label=\"Remove {label}\">×</button></li>",
                label = escape_html(&selection.label),
                kind = selection.kind().as_str(),
                area = format_sq_ft(selection.area_sq_ft),
                id = escape_html(&selection.id),
            )
        })
        .collect::<String>();
    if rows.is_empty() {
        list.set_inner_html("<li class=\"empty\">No areas measured yet.</li>");
    } else {
        list.set_inner_html(&rows);
    }
    total.set_text_content(Some(&format!(
        "{} sq ft",
        format_sq_ft(estimator.total())
    )));
}

pub fn render_projects(list: &Element, projects: &[Project]) {
    if projects.is_empty() {
        list.set_inner_html("<li class=\"empty\">No saved projects.</li>");
        return;
    }
    let rows = projects
        .iter()
        .map(|project| {
            let saved = js_sys::Date::new(&(project.saved_at as f64).into())
                .to_locale_string("default", &wasm_bindgen::JsValue::UNDEFINED);
            format!(
                "<li><button type=\"button\" data-action=\"load\" data-id=\"{id}\">{name}</button> <span class=\"project-meta\">{area} sq ft, {count} area(s), {saved}</span> <button type=\"button\" data-action=\"delete\" data-id=\"{id}\" aria-label=\"Delete {name}\">×</button></li>",
                id = escape_html(&project.id),
                name = escape_html(&project.name),
                area = format_sq_ft(project.total_sq_ft),
                count = project.selection_count,
                saved = escape_html(&String::from(saved)),
            )
        })
        .collect::<String>();
    list.set_inner_html(&rows);
}

pub fn render_account(label: &Element, user: Option<&str>) {
    let text = match user {
        Some(user) => format!("Signed in as {user}"),
        None => "Not signed in; projects are saved on this device only.".to_string(),
    };
    label.set_text_content(Some(&text));
}

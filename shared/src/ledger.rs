use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::area::{self, AreaError, Measurement};
use crate::project_file::{self, Blueprint, ExportedState, ImportError, ProjectFile};
use crate::units::format_sq_ft;
use crate::{Mode, ShapeDescriptor};

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub id: String,
    pub label: String,
    pub shape: ShapeDescriptor,
    pub measurement: Measurement,
    /// Engine result on `measurement` when the selection was created.
    pub area_sq_ft: f64,
}

impl Selection {
    pub fn kind(&self) -> Mode {
        self.shape.kind()
    }
}

/// Read-only projection handed to the chat relay. Carries no geometry.
#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    pub total_sq_ft: f64,
    pub selections_count: usize,
    pub selections: Vec<SelectionSummary>,
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SelectionSummary {
    pub label: String,
    #[serde(rename = "type")]
    pub kind: Mode,
    pub area_sq_ft: f64,
    pub measurement: Measurement,
}

impl Snapshot {
    /// One line per selection, for plain-text consumers.
    pub fn summary_text(&self) -> String {
        if self.selections.is_empty() {
            return "No areas measured yet.".to_string();
        }
        self.selections
            .iter()
            .map(|item| {
                format!(
                    "{} ({}): {} sq ft",
                    item.label,
                    item.kind.as_str(),
                    format_sq_ft(item.area_sq_ft)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Ordered collection of committed selections.
#[derive(Clone, Debug, Default)]
pub struct Ledger {
    selections: Vec<Selection>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_selections(selections: Vec<Selection>) -> Self {
        Self { selections }
    }

    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }

    pub fn len(&self) -> usize {
        self.selections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Selection> {
        self.selections.iter().find(|selection| selection.id == id)
    }

    pub fn default_label(&self) -> String {
        format!("Area {}", self.selections.len() + 1)
    }

    /// Computes the area from `measurement` and appends a new selection.
    /// Blank labels fall back to [`Ledger::default_label`].
    pub fn append(
        &mut self,
        shape: ShapeDescriptor,
        measurement: Measurement,
        label: Option<&str>,
    ) -> Result<&Selection, AreaError> {
        let area_sq_ft = area::area_sq_ft(&measurement)?;
        let label = match label.map(str::trim) {
            Some(label) if !label.is_empty() => label.to_string(),
            _ => self.default_label(),
        };
        let selection = Selection {
            id: Uuid::new_v4().to_string(),
            label,
            shape,
            measurement,
            area_sq_ft,
        };
        debug!(id = %selection.id, area = selection.area_sq_ft, "selection appended");
        self.selections.push(selection);
        Ok(&self.selections[self.selections.len() - 1])
    }

    pub fn undo(&mut self) -> Option<Selection> {
        self.selections.pop()
    }

    pub fn remove_by_id(&mut self, id: &str) -> Option<Selection> {
        let index = self.selections.iter().position(|selection| selection.id == id)?;
        Some(self.selections.remove(index))
    }

    pub fn clear(&mut self) {
        self.selections.clear();
    }

    pub fn total(&self) -> f64 {
        self.selections.iter().map(|selection| selection.area_sq_ft).sum()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            total_sq_ft: self.total(),
            selections_count: self.selections.len(),
            selections: self
                .selections
                .iter()
                .map(|selection| SelectionSummary {
                    label: selection.label.clone(),
                    kind: selection.kind(),
                    area_sq_ft: selection.area_sq_ft,
                    measurement: selection.measurement.clone(),
                })
                .collect(),
        }
    }

    pub fn export_state(&self, mode: Mode, blueprint: Option<&Blueprint>) -> ExportedState {
        project_file::export(mode, self.selections.clone(), self.snapshot(), blueprint)
    }

    /// Replaces the ledger with the selections in a serialized project.
    /// Nothing is touched unless `selections` is a list.
    pub fn import_state(&mut self, payload: &str) -> Result<ProjectFile, ImportError> {
        let file = project_file::parse_json(payload)?;
        self.adopt(&file);
        Ok(file)
    }

    pub fn import_file(&mut self, file: ProjectFile) -> ProjectFile {
        let file = project_file::sanitize(file);
        self.adopt(&file);
        file
    }

    fn adopt(&mut self, file: &ProjectFile) {
        self.selections = file.selections.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Point;

    fn rect() -> ShapeDescriptor {
        ShapeDescriptor::Rect {
            a: Point::new(0.1, 0.1),
            b: Point::new(0.4, 0.5),
        }
    }

    #[test]
    fn default_labels_count_up() {
        let mut ledger = Ledger::new();
        let first = ledger
            .append(rect(), Measurement::Rect { width: 1.0, height: 2.0 }, None)
            .unwrap()
            .label
            .clone();
        let second = ledger
            .append(rect(), Measurement::Rect { width: 1.0, height: 2.0 }, Some("  "))
            .unwrap()
            .label
            .clone();
        let named = ledger
            .append(rect(), Measurement::Rect { width: 1.0, height: 2.0 }, Some(" Kitchen "))
            .unwrap()
            .label
            .clone();
        assert_eq!(first, "Area 1");
        assert_eq!(second, "Area 2");
        assert_eq!(named, "Kitchen");
    }

    #[test]
    fn invalid_measurement_is_not_appended() {
        let mut ledger = Ledger::new();
        let result = ledger.append(rect(), Measurement::Rect { width: -1.0, height: 2.0 }, None);
        assert!(result.is_err());
        assert!(ledger.is_empty());
    }

    #[test]
    fn remove_unknown_id_is_noop() {
        let mut ledger = Ledger::new();
        ledger
            .append(rect(), Measurement::Rect { width: 3.0, height: 3.0 }, None)
            .unwrap();
        assert!(ledger.remove_by_id("missing").is_none());
        assert_eq!(ledger.len(), 1);
        assert!(Ledger::new().undo().is_none());
    }

    #[test]
    fn snapshot_has_no_geometry() {
        let mut ledger = Ledger::new();
        ledger
            .append(rect(), Measurement::Rect { width: 10.0, height: 12.0 }, Some("Den"))
            .unwrap();
        let value = serde_json::to_value(ledger.snapshot()).unwrap();
        assert_eq!(value["totalSqFt"], 120.0);
        assert_eq!(value["selectionsCount"], 1);
        assert_eq!(value["selections"][0]["type"], "rect");
        assert_eq!(value["selections"][0]["label"], "Den");
        assert!(value["selections"][0].get("shape").is_none());
        assert_eq!(ledger.snapshot().summary_text(), "Den (rect): 120.00 sq ft");
    }
}

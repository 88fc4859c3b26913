use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::area;
use crate::ledger::{Selection, Snapshot};
use crate::Mode;

pub const PROJECT_FILE_MAGIC: [u8; 4] = *b"BPEF";
pub const PROJECT_FILE_VERSION: u32 = 1;
const PROJECT_HEADER_LEN: usize = PROJECT_FILE_MAGIC.len() + std::mem::size_of::<u32>();

/// Blueprint images larger than this are left out of saved state.
pub const MAX_PERSISTED_IMAGE_BYTES: usize = 2_000_000;
/// Relative slack allowed between a stored area and its recomputed value.
const AREA_TOLERANCE: f64 = 1e-9;
pub const MAX_UPLOAD_BYTES: usize = 8 * 1024 * 1024;
pub const ACCEPTED_IMAGE_TYPES: [&str; 4] = ["image/png", "image/jpeg", "image/gif", "image/webp"];

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Blueprint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_url: Option<String>,
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    pub version: u32,
    pub mode: Mode,
    pub selections: Vec<Selection>,
    pub blueprint: Option<Blueprint>,
    pub snapshot: Snapshot,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExportedState {
    pub file: ProjectFile,
    /// The blueprint image was too large to keep; the UI must say so.
    pub image_dropped: bool,
}

impl ExportedState {
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.file).unwrap_or_default()
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImportError {
    #[error("project data is not valid JSON: {0}")]
    Malformed(String),
    #[error("project data must be a JSON object")]
    NotAnObject,
    #[error("project data has no list of selections")]
    MissingSelections,
    #[error("unsupported project file version {0}")]
    UnsupportedVersion(u64),
    #[error("binary project file is corrupt")]
    InvalidBinary,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImageError {
    #[error("\"{0}\" is not a supported image type; use PNG, JPEG, GIF or WebP")]
    UnsupportedType(String),
    #[error("image is {0} bytes; the limit is 8 MB")]
    TooLarge(usize),
}

/// Checks an uploaded file before it is read.
pub fn validate_image(mime: &str, bytes: usize) -> Result<(), ImageError> {
    if !ACCEPTED_IMAGE_TYPES.contains(&mime) {
        return Err(ImageError::UnsupportedType(mime.to_string()));
    }
    if bytes > MAX_UPLOAD_BYTES {
        return Err(ImageError::TooLarge(bytes));
    }
    Ok(())
}

pub fn export(
    mode: Mode,
    selections: Vec<Selection>,
    snapshot: Snapshot,
    blueprint: Option<&Blueprint>,
) -> ExportedState {
    let oversized = blueprint
        .and_then(|blueprint| blueprint.data_url.as_ref())
        .is_some_and(|url| url.len() > MAX_PERSISTED_IMAGE_BYTES);
    let blueprint = if oversized {
        warn!("blueprint image exceeds {MAX_PERSISTED_IMAGE_BYTES} bytes, not persisted");
        Some(Blueprint::default())
    } else {
        blueprint.cloned()
    };
    ExportedState {
        file: ProjectFile {
            version: PROJECT_FILE_VERSION,
            mode,
            selections,
            blueprint,
            snapshot,
        },
        image_dropped: oversized,
    }
}

pub fn parse_json(text: &str) -> Result<ProjectFile, ImportError> {
    let value: Value =
        serde_json::from_str(text).map_err(|error| ImportError::Malformed(error.to_string()))?;
    from_value(&value)
}

/// Reads a project from loosely-typed JSON. The selection list is checked
/// first; a single malformed selection is skipped rather than failing the load.
pub fn from_value(value: &Value) -> Result<ProjectFile, ImportError> {
    let object = value.as_object().ok_or(ImportError::NotAnObject)?;
    let Some(Value::Array(items)) = object.get("selections") else {
        return Err(ImportError::MissingSelections);
    };
    let version = object
        .get("version")
        .and_then(Value::as_u64)
        .unwrap_or(u64::from(PROJECT_FILE_VERSION));
    if version > u64::from(PROJECT_FILE_VERSION) {
        return Err(ImportError::UnsupportedVersion(version));
    }
    let mode = object
        .get("mode")
        .and_then(|mode| serde_json::from_value(mode.clone()).ok())
        .unwrap_or_default();
    let blueprint = object
        .get("blueprint")
        .and_then(|blueprint| serde_json::from_value::<Option<Blueprint>>(blueprint.clone()).ok())
        .flatten();
    let selections = items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<Selection>(item.clone()) {
            Ok(selection) => Some(selection),
            Err(error) => {
                warn!(index, %error, "skipping malformed selection");
                None
            }
        })
        .collect();

    Ok(sanitize(ProjectFile {
        version: PROJECT_FILE_VERSION,
        mode,
        selections,
        blueprint,
        snapshot: Snapshot::default(),
    }))
}

/// Drops selections that cannot be drawn or carry no usable area, and
/// recomputes the snapshot from what is left.
pub fn sanitize(mut file: ProjectFile) -> ProjectFile {
    file.selections = file
        .selections
        .into_iter()
        .enumerate()
        .filter_map(|(index, selection)| sanitize_selection(index, selection))
        .collect();
    file.snapshot = snapshot_of(&file.selections);
    file
}

fn sanitize_selection(index: usize, mut selection: Selection) -> Option<Selection> {
    let computed = match area::area_sq_ft(&selection.measurement) {
        Ok(computed) => computed,
        Err(error) => {
            warn!(index, %error, "skipping selection with unusable measurements");
            return None;
        }
    };
    if !((selection.area_sq_ft - computed).abs() <= AREA_TOLERANCE * computed.max(1.0)) {
        warn!(
            index,
            stored = selection.area_sq_ft,
            computed,
            "skipping selection whose area does not match its measurements"
        );
        return None;
    }
    selection.shape = selection.shape.sanitized()?;
    if selection.id.is_empty() || selection.id.len() > 64 {
        selection.id = Uuid::new_v4().to_string();
    }
    if selection.label.trim().is_empty() {
        selection.label = format!("Area {}", index + 1);
    }
    Some(selection)
}

fn snapshot_of(selections: &[Selection]) -> Snapshot {
    crate::Ledger::from_selections(selections.to_vec()).snapshot()
}

pub fn encode_project_file(file: &ProjectFile) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&PROJECT_FILE_MAGIC);
    payload.extend_from_slice(&PROJECT_FILE_VERSION.to_le_bytes());
    let body = bincode::encode_to_vec(file, bincode::config::standard()).unwrap_or_default();
    payload.extend_from_slice(&body);
    payload
}

pub fn decode_project_file(payload: &[u8]) -> Result<ProjectFile, ImportError> {
    if !(payload.len() >= PROJECT_HEADER_LEN && payload.starts_with(&PROJECT_FILE_MAGIC)) {
        return Err(ImportError::InvalidBinary);
    }
    let version = u32::from_le_bytes(
        payload[PROJECT_FILE_MAGIC.len()..PROJECT_HEADER_LEN]
            .try_into()
            .map_err(|_| ImportError::InvalidBinary)?,
    );
    let body = &payload[PROJECT_HEADER_LEN..];
    match version {
        1 => bincode::decode_from_slice(body, bincode::config::standard())
            .map(|(file, _)| sanitize(file))
            .map_err(|_| ImportError::InvalidBinary),
        _ => Err(ImportError::UnsupportedVersion(u64::from(version))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Ledger, Measurement, Point, ShapeDescriptor};

    fn sample_file() -> ProjectFile {
        let mut ledger = Ledger::new();
        ledger
            .append(
                ShapeDescriptor::Rect {
                    a: Point::new(0.1, 0.1),
                    b: Point::new(0.5, 0.5),
                },
                Measurement::Rect {
                    width: 10.0,
                    height: 12.0,
                },
                Some("Living room"),
            )
            .unwrap();
        ledger.export_state(Mode::Circle, None).file
    }

    #[test]
    fn rejects_payload_without_selection_list() {
        assert_eq!(
            parse_json(r#"{"version":1,"selections":"nope"}"#),
            Err(ImportError::MissingSelections)
        );
        assert_eq!(parse_json("[]"), Err(ImportError::NotAnObject));
        assert!(matches!(parse_json("{"), Err(ImportError::Malformed(_))));
    }

    #[test]
    fn rejects_future_versions() {
        assert_eq!(
            parse_json(r#"{"version":9,"selections":[]}"#),
            Err(ImportError::UnsupportedVersion(9))
        );
    }

    #[test]
    fn skips_malformed_selections() {
        let mut value = serde_json::to_value(sample_file()).unwrap();
        value["selections"]
            .as_array_mut()
            .unwrap()
            .push(serde_json::json!({"label": "broken"}));
        let file = from_value(&value).unwrap();
        assert_eq!(file.selections.len(), 1);
        assert_eq!(file.snapshot.selections_count, 1);
        assert_eq!(file.mode, Mode::Circle);
    }

    #[test]
    fn selections_must_match_their_measurements() {
        let mut value = serde_json::to_value(sample_file()).unwrap();
        let valid = value["selections"][0].clone();

        let mut negative = valid.clone();
        negative["measurement"] = serde_json::json!({"type": "rect", "width": -5.0, "height": 2.0});
        negative["areaSqFt"] = serde_json::json!(999.0);

        let mut inflated = valid.clone();
        inflated["areaSqFt"] = serde_json::json!(999.0);

        value["selections"] = serde_json::json!([valid, negative, inflated]);
        let file = from_value(&value).unwrap();
        assert_eq!(file.selections.len(), 1);
        assert_eq!(file.selections[0].area_sq_ft, 120.0);
        assert_eq!(file.snapshot.total_sq_ft, 120.0);
    }

    #[test]
    fn out_of_range_points_are_clamped() {
        let mut value = serde_json::to_value(sample_file()).unwrap();
        value["selections"][0]["shape"]["b"]["x"] = serde_json::json!(3.5);
        let file = from_value(&value).unwrap();
        let ShapeDescriptor::Rect { b, .. } = &file.selections[0].shape else {
            panic!("expected a rectangle");
        };
        assert_eq!(b.x, 1.0);
    }

    #[test]
    fn oversized_image_is_dropped_on_export() {
        let blueprint = Blueprint {
            data_url: Some("x".repeat(MAX_PERSISTED_IMAGE_BYTES + 1)),
        };
        let exported = Ledger::new().export_state(Mode::Rect, Some(&blueprint));
        assert!(exported.image_dropped);
        assert_eq!(exported.file.blueprint, Some(Blueprint::default()));

        let small = Blueprint {
            data_url: Some("data:image/png;base64,AAAA".into()),
        };
        let exported = Ledger::new().export_state(Mode::Rect, Some(&small));
        assert!(!exported.image_dropped);
        assert_eq!(exported.file.blueprint, Some(small));
    }

    #[test]
    fn image_uploads_are_checked() {
        assert_eq!(validate_image("image/png", 1024), Ok(()));
        assert_eq!(
            validate_image("application/pdf", 10),
            Err(ImageError::UnsupportedType("application/pdf".into()))
        );
        assert_eq!(
            validate_image("image/jpeg", MAX_UPLOAD_BYTES + 1),
            Err(ImageError::TooLarge(MAX_UPLOAD_BYTES + 1))
        );
    }

    #[test]
    fn binary_file_round_trips() {
        let file = sample_file();
        let payload = encode_project_file(&file);
        assert!(payload.starts_with(&PROJECT_FILE_MAGIC));
        assert_eq!(decode_project_file(&payload), Ok(file));
    }

    #[test]
    fn binary_decode_rejects_bad_headers() {
        assert_eq!(decode_project_file(b"nope"), Err(ImportError::InvalidBinary));
        let mut payload = PROJECT_FILE_MAGIC.to_vec();
        payload.extend_from_slice(&7u32.to_le_bytes());
        assert_eq!(
            decode_project_file(&payload),
            Err(ImportError::UnsupportedVersion(7))
        );
    }
}

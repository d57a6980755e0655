//! Entity JSON ingest and normalization.
//!
//! Turns a loosely typed listing payload into `Entity` values.
//!
//! - **Strict top level**: the payload must be an array of entities (or an
//!   object wrapping one under `listings`/`entities`/`data`); anything else is
//!   fatal (exit code 2).
//! - **Lenient rows**: a single malformed entity is skipped and recorded as a
//!   `RowError`; the batch continues.
//! - Numeric occupancy fields may be absent; they degrade to zero later, never
//!   here.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::data::provider::{EntitySource, IngestedEntities, RowError};
use crate::domain::{Entity, Timeframe, UNKNOWN_GROUP};
use crate::error::AppError;

const WRAPPER_KEYS: [&str; 3] = ["listings", "entities", "data"];

/// Entities read from a JSON file on disk.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    label: String,
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            label: format!("file:{}", path.display()),
            path,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

impl EntitySource for JsonFileSource {
    fn name(&self) -> &str {
        &self.label
    }

    fn fetch_entities(&self) -> Result<IngestedEntities, AppError> {
        load_entities(&self.path)
    }
}

/// Read and normalize an entity file.
pub fn load_entities(path: &Path) -> Result<IngestedEntities, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open entities '{}': {e}", path.display())))?;
    let value: Value = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::malformed(format!("Invalid entities JSON '{}': {e}", path.display())))?;
    entities_from_value(&value)
}

/// Normalize an already-parsed payload.
pub fn entities_from_value(value: &Value) -> Result<IngestedEntities, AppError> {
    let rows = entity_array(value)
        .ok_or_else(|| AppError::malformed("Entities payload is not an array of entities."))?;

    let mut entities = Vec::with_capacity(rows.len());
    let mut row_errors = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        match parse_entity(row) {
            Ok(entity) => entities.push(entity),
            Err((id, message)) => {
                tracing::warn!(index, id = id.as_deref().unwrap_or("-"), %message, "skipping malformed entity");
                row_errors.push(RowError { index, id, message });
            }
        }
    }

    Ok(IngestedEntities {
        entities,
        row_errors,
        rows_read: rows.len(),
    })
}

fn entity_array(value: &Value) -> Option<&Vec<Value>> {
    match value {
        Value::Array(rows) => Some(rows),
        Value::Object(obj) => WRAPPER_KEYS
            .iter()
            .find_map(|key| obj.get(*key).and_then(Value::as_array)),
        _ => None,
    }
}

fn parse_entity(row: &Value) -> Result<Entity, (Option<String>, String)> {
    let obj = row
        .as_object()
        .ok_or_else(|| (None, "Entity is not a JSON object.".to_string()))?;

    let id = get_text(obj, &["id", "listing_id"]).ok_or_else(|| (None, "Missing required field: `id`".to_string()))?;

    let group = get_text(obj, &["group", "group_name"]).unwrap_or_else(|| UNKNOWN_GROUP.to_string());
    let city = get_text(obj, &["city", "location"]);
    let bedrooms = get_text(obj, &["bedrooms", "size_class"]);

    let mut precomputed = [None; 5];
    for tf in Timeframe::ALL {
        precomputed[tf.index()] = precomputed_value(obj, tf).map_err(|msg| (Some(id.clone()), msg))?;
    }

    Ok(Entity {
        occupancy_short: get_text(obj, &["occupancy_last_30", "occupancy_30"]),
        occupancy_long: get_text(obj, &["occupancy_last_90", "occupancy_90"]),
        id,
        group,
        city,
        bedrooms,
        precomputed,
    })
}

/// Precomputed index from `mpi: {"7": ..}` or a flat `mpi_7` key.
///
/// `null` and absent keys are "no value"; non-numeric text is a row error.
fn precomputed_value(obj: &Map<String, Value>, timeframe: Timeframe) -> Result<Option<f64>, String> {
    let days = timeframe.days().to_string();
    let nested = obj
        .get("mpi")
        .and_then(Value::as_object)
        .and_then(|m| m.get(&days));
    let flat_key = format!("mpi_{days}");
    let raw = nested.or_else(|| obj.get(&flat_key));

    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64().filter(|v| v.is_finite())),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| format!("Invalid `mpi_{days}` value '{s}'.")),
        Some(other) => Err(format!("Invalid `mpi_{days}` value {other}.")),
    }
}

/// First present, non-empty key rendered as text (numbers are stringified).
fn get_text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_nested_and_flat_precomputed() {
        let payload = json!([
            { "id": "L1", "city": "Denver", "bedrooms": 2, "mpi": { "7": 1.02, "30": null },
              "occupancy_last_30": "80 %", "occupancy_last_90": "Unavailable" },
            { "id": 42, "group": "Beach", "mpi_120": "0.85" }
        ]);
        let ingest = entities_from_value(&payload).unwrap();
        assert_eq!(ingest.rows_read, 2);
        assert!(ingest.row_errors.is_empty());

        let l1 = &ingest.entities[0];
        assert_eq!(l1.group, "Unknown");
        assert_eq!(l1.bedrooms.as_deref(), Some("2"));
        assert_eq!(l1.precomputed, [Some(1.02), None, None, None, None]);
        assert_eq!(l1.occupancy_short.as_deref(), Some("80 %"));

        let l2 = &ingest.entities[1];
        assert_eq!(l2.id, "42");
        assert_eq!(l2.group, "Beach");
        assert_eq!(l2.precomputed[4], Some(0.85));
        assert_eq!(l2.occupancy_short, None);
    }

    #[test]
    fn malformed_rows_are_skipped_and_counted() {
        let payload = json!({
            "listings": [
                { "id": "ok" },
                "not an object",
                { "city": "Miami" },
                { "id": "bad-mpi", "mpi_7": "lots" }
            ]
        });
        let ingest = entities_from_value(&payload).unwrap();
        assert_eq!(ingest.entities.len(), 1);
        assert_eq!(ingest.row_errors.len(), 3);
        assert_eq!(ingest.row_errors[2].id.as_deref(), Some("bad-mpi"));
        assert_eq!(ingest.row_errors[1].index, 2);
    }

    #[test]
    fn non_array_payload_is_fatal() {
        let err = entities_from_value(&json!({ "count": 3 })).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(entities_from_value(&json!("listings")).is_err());
    }
}

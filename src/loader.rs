use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::cell::{CellValue, Record};

/// Failures while turning a backend response into records
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Expected a JSON array of rows or an object with a \"data\" array")]
    NotACollection,

    #[error("Row {index} is not a JSON object")]
    RowNotObject { index: usize },
}

/// Build records from a REST collection response
///
/// Accepts either a bare array of objects or an envelope object carrying the
/// array under `data`. Field order is kept as received. Nested objects are
/// flattened into dotted keys (`rider.name`) and arrays become comma-joined
/// text.
///
/// # Arguments
/// * `value` - Parsed JSON response body
///
/// # Returns
/// * `Result<Vec<Record>, LoadError>` - One record per row or the first structural problem
///
/// # Examples
/// ```
/// use rental_admin::loader::records_from_json;
/// use serde_json::json;
///
/// let rows = records_from_json(&json!({"data": [{"id": "R-1", "rider": {"name": "Asha"}}]})).unwrap();
/// assert_eq!(rows[0].get("rider.name").unwrap().to_display_string(), "Asha");
/// ```
pub fn records_from_json(value: &Value) -> Result<Vec<Record>, LoadError> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(envelope) => match envelope.get("data") {
            Some(Value::Array(items)) => items,
            _ => return Err(LoadError::NotACollection),
        },
        _ => return Err(LoadError::NotACollection),
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(map) => Ok(record_from_object(map)),
            _ => Err(LoadError::RowNotObject { index }),
        })
        .collect()
}

/// Parse a response body and build records from it
pub fn records_from_str(body: &str) -> Result<Vec<Record>, LoadError> {
    let value: Value = serde_json::from_str(body)?;
    records_from_json(&value)
}

/// Load records from a JSON snapshot on disk
pub fn records_from_path(path: impl AsRef<Path>) -> Result<Vec<Record>, LoadError> {
    let path = path.as_ref();
    let body = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let records = records_from_str(&body)?;
    log::info!("loaded {} rows from {}", records.len(), path.display());
    Ok(records)
}

pub(crate) fn record_from_object(map: &Map<String, Value>) -> Record {
    let mut record = Record::new();
    flatten_into(&mut record, None, map);
    record
}

fn flatten_into(record: &mut Record, prefix: Option<&str>, map: &Map<String, Value>) {
    for (key, value) in map {
        let name = match prefix {
            Some(prefix) => format!("{}.{}", prefix, key),
            None => key.clone(),
        };
        match value {
            Value::Object(inner) => flatten_into(record, Some(&name), inner),
            other => record.insert(name, cell_from_json(other)),
        }
    }
}

/// Map one JSON scalar onto a cell
pub fn cell_from_json(value: &Value) -> CellValue {
    match value {
        Value::Null => CellValue::Null,
        Value::Bool(b) => CellValue::Bool(*b),
        Value::Number(n) => n.as_f64().map_or(CellValue::Null, CellValue::Number),
        Value::String(s) => CellValue::Text(s.clone()),
        Value::Array(items) => CellValue::Text(
            items
                .iter()
                .map(|item| match item {
                    Value::Null => String::new(),
                    Value::Object(_) => item.to_string(),
                    other => cell_from_json(other).to_display_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Object(_) => CellValue::Text(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn arrays_join_with_commas() {
        assert_eq!(
            cell_from_json(&json!(["BAT-1", 2, null, true])),
            CellValue::Text("BAT-1,2,,true".into())
        );
    }

    #[test]
    fn empty_nested_object_contributes_nothing() {
        let rows = records_from_json(&json!([{"id": 1, "meta": {}}])).unwrap();
        assert_eq!(rows[0].len(), 1);
    }

    #[test]
    fn numbers_stay_numbers() {
        let rows = records_from_json(&json!([{"total": 1250.5}])).unwrap();
        assert_eq!(rows[0].get("total"), Some(&CellValue::Number(1250.5)));
    }
}

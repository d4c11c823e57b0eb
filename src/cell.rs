use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A single table cell as received from the rental backend
///
/// Backend payloads are loosely typed: the same field may be a number on one row,
/// a numeric string on the next and missing on a third. Every shape a report page
/// can see is captured by one of these variants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    /// Missing field or explicit JSON `null`
    #[default]
    Null,

    /// Flags such as `is_active` or `damaged`
    Bool(bool),

    /// Any numeric value; may be non-finite when constructed in code
    Number(f64),

    /// Free text, including numeric-looking and date-like strings
    Text(String),

    /// A point in time built by the caller (never produced by JSON decoding)
    Instant(DateTime<Utc>),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Stringify the value the way it is written into an export file
    ///
    /// # Returns
    /// * `String` - Empty for null, `true`/`false` for booleans, shortest decimal
    ///   form for numbers and RFC 3339 (millisecond precision) for instants
    ///
    /// # Examples
    /// ```
    /// use rental_admin::cell::CellValue;
    ///
    /// assert_eq!(CellValue::Number(42.0).to_display_string(), "42");
    /// assert_eq!(CellValue::Number(2.5).to_display_string(), "2.5");
    /// assert_eq!(CellValue::Null.to_display_string(), "");
    /// ```
    pub fn to_display_string(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Text(s) => s.clone(),
            CellValue::Instant(t) => t.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Format a float with no trailing `.0` and JavaScript-style names for non-finite values
pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        // Covers -0.0 as well
        "0".to_string()
    } else {
        n.to_string()
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<DateTime<Utc>> for CellValue {
    fn from(value: DateTime<Utc>) -> Self {
        CellValue::Instant(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Null, Into::into)
    }
}

/// Read access to a row of tabular data
///
/// The sort and export engines are generic over this trait so both dynamic
/// [`Record`]s and typed structs can be fed to them.
pub trait Row {
    /// Value stored under `key`, or `None` when the row has no such field
    fn cell(&self, key: &str) -> Option<&CellValue>;

    /// Field names in the row's own order
    fn keys(&self) -> Vec<&str>;
}

/// One row of report data: field name to cell value, in insertion order
///
/// Field order matters for exports that infer their columns from the data, so
/// a plain hash map is not used here.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "serde_json::Map<String, serde_json::Value>", into = "serde_json::Map<String, serde_json::Value>")]
pub struct Record {
    fields: Vec<(String, CellValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Set a field; an existing field keeps its position
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<CellValue>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    /// Builder-style variant of [`Record::insert`]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Row for Record {
    fn cell(&self, key: &str) -> Option<&CellValue> {
        self.get(key)
    }

    fn keys(&self) -> Vec<&str> {
        self.fields.iter().map(|(k, _)| k.as_str()).collect()
    }
}

impl<K: Into<String>, V: Into<CellValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Record {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        crate::loader::record_from_object(&map)
    }
}

impl From<Record> for serde_json::Map<String, serde_json::Value> {
    fn from(record: Record) -> Self {
        record
            .fields
            .into_iter()
            .map(|(k, v)| (k, cell_to_json(v)))
            .collect()
    }
}

fn cell_to_json(value: CellValue) -> serde_json::Value {
    match value {
        CellValue::Null => serde_json::Value::Null,
        CellValue::Bool(b) => serde_json::Value::Bool(b),
        // Non-finite numbers have no JSON form
        CellValue::Number(n) => serde_json::Number::from_f64(n)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),
        CellValue::Text(s) => serde_json::Value::String(s),
        instant @ CellValue::Instant(_) => serde_json::Value::String(instant.to_display_string()),
    }
}

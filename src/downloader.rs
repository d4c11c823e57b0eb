use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cell::{CellValue, Row};

/// MIME type attached to CSV exports
pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// MIME type attached to XLSX exports
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Computes a cell from a whole row, for derived columns
pub type ValueGetter<T> = Arc<dyn Fn(&T) -> CellValue + Send + Sync>;

/// Export column definition
///
/// `key` names the field read from each row (and identifies the column for
/// sorting); `header` is the title written on the first line of the file.
/// When `get_value` is set it replaces the plain field lookup.
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Column<T> {
    /// Field name in the row
    pub key: String,

    /// Column title; the key is used when empty
    #[serde(default)]
    pub header: String,

    /// Optional extractor for computed columns
    #[serde(skip)]
    pub get_value: Option<ValueGetter<T>>,
}

impl<T> Column<T> {
    pub fn new(key: impl Into<String>, header: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            header: header.into(),
            get_value: None,
        }
    }

    /// Column whose cells are computed from the row
    pub fn computed<F>(key: impl Into<String>, header: impl Into<String>, get_value: F) -> Self
    where
        F: Fn(&T) -> CellValue + Send + Sync + 'static,
    {
        Self {
            key: key.into(),
            header: header.into(),
            get_value: Some(Arc::new(get_value)),
        }
    }

    /// Header text, falling back to the key
    pub fn title(&self) -> &str {
        if self.header.is_empty() {
            &self.key
        } else {
            &self.header
        }
    }

    /// Extract this column's cell from `row`
    pub fn value_of(&self, row: &T) -> CellValue
    where
        T: Row,
    {
        match &self.get_value {
            Some(get_value) => get_value(row),
            None => row.cell(&self.key).cloned().unwrap_or_default(),
        }
    }

    fn is_blank(&self) -> bool {
        self.key.is_empty() && self.header.is_empty() && self.get_value.is_none()
    }
}

impl<T> Clone for Column<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            header: self.header.clone(),
            get_value: self.get_value.clone(),
        }
    }
}

impl<T> fmt::Debug for Column<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("key", &self.key)
            .field("header", &self.header)
            .field("computed", &self.get_value.is_some())
            .finish()
    }
}

/// A generated file ready to be handed to the user
#[derive(Clone, Debug, PartialEq)]
pub struct Download {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl Download {
    /// Write the file into `dir`, keeping only the final component of the filename
    ///
    /// # Returns
    /// * `io::Result<PathBuf>` - Path of the written file
    pub fn save_to(&self, dir: impl AsRef<Path>) -> io::Result<PathBuf> {
        let name = Path::new(&self.filename)
            .file_name()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("Invalid export filename: {:?}", self.filename),
                )
            })?
            .to_owned();

        let path = dir.as_ref().join(name);
        fs::write(&path, &self.bytes)?;
        log::info!("wrote {} bytes to {}", self.bytes.len(), path.display());
        Ok(path)
    }
}

/// Escape a single value for a CSV field
///
/// Values containing a comma, a double quote or a line break, or that start or
/// end with whitespace, are wrapped in double quotes with inner quotes doubled.
///
/// # Examples
/// ```
/// use rental_admin::cell::CellValue;
/// use rental_admin::downloader::escape_csv_cell;
///
/// assert_eq!(escape_csv_cell(&"x,y".into()), "\"x,y\"");
/// assert_eq!(escape_csv_cell(&"He said \"hi\"".into()), "\"He said \"\"hi\"\"\"");
/// assert_eq!(escape_csv_cell(&CellValue::Null), "");
/// ```
pub fn escape_csv_cell(value: &CellValue) -> String {
    let text = value.to_display_string();
    let needs_quotes = text.contains([',', '"', '\r', '\n'])
        || text.starts_with(char::is_whitespace)
        || text.ends_with(char::is_whitespace);

    if needs_quotes {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text
    }
}

/// Columns to export: the non-blank given ones, otherwise every key seen in `rows`
fn resolve_columns<T: Row>(columns: &[Column<T>], rows: &[T]) -> Vec<Column<T>> {
    let given: Vec<Column<T>> = columns.iter().filter(|c| !c.is_blank()).cloned().collect();
    if !given.is_empty() {
        return given;
    }

    let mut keys: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !keys.iter().any(|k| k == key) {
                keys.push(key.to_string());
            }
        }
    }
    keys.into_iter()
        .map(|key| Column::new(key.clone(), key))
        .collect()
}

/// Convert rows to CSV text
///
/// The first line holds the column headers, followed by one line per row.
/// Lines are separated by CRLF and there is no trailing line break.
///
/// # Arguments
/// * `columns` - Columns in output order; when empty they are inferred from the rows
///   in first-seen key order
/// * `rows` - Rows to write, in output order
///
/// # Returns
/// * `String` - CSV content
///
/// # Examples
/// ```
/// use rental_admin::cell::Record;
/// use rental_admin::downloader::{Column, to_csv};
///
/// let rows = vec![Record::new().with("a", "x,y").with("b", 2)];
/// let columns = vec![Column::new("a", "A"), Column::new("b", "B")];
/// assert_eq!(to_csv(&columns, &rows), "A,B\r\n\"x,y\",2");
/// ```
pub fn to_csv<T: Row>(columns: &[Column<T>], rows: &[T]) -> String {
    let columns = resolve_columns(columns, rows);

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        columns
            .iter()
            .map(|c| escape_csv_cell(&CellValue::Text(c.title().to_string())))
            .collect::<Vec<_>>()
            .join(","),
    );

    for row in rows {
        lines.push(
            columns
                .iter()
                .map(|c| escape_csv_cell(&c.value_of(row)))
                .collect::<Vec<_>>()
                .join(","),
        );
    }

    lines.join("\r\n")
}

/// Build a CSV file for download
///
/// # Arguments
/// * `filename` - Name the user will see for the file
/// * `columns` - Export columns (see [`to_csv`])
/// * `rows` - Rows in the order they should appear
///
/// # Returns
/// * `Download` - UTF-8 CSV bytes tagged `text/csv; charset=utf-8`
pub fn download_csv<T: Row>(filename: &str, columns: &[Column<T>], rows: &[T]) -> Download {
    let csv = to_csv(columns, rows);
    log::debug!(
        "prepared CSV export {} ({} rows, {} bytes)",
        filename,
        rows.len(),
        csv.len()
    );

    Download {
        filename: filename.to_string(),
        content_type: CSV_CONTENT_TYPE,
        bytes: csv.into_bytes(),
    }
}

/// Convert rows to XLSX format
///
/// Uses the same column resolution as [`to_csv`]. Headers go in the first row,
/// numbers and booleans keep their type and everything else is written as text.
///
/// # Arguments
/// * `columns` - Export columns
/// * `rows` - Rows to write
///
/// # Returns
/// * `Result<Vec<u8>, Box<dyn Error>>` - XLSX file content as bytes or an error
#[cfg(feature = "web")]
pub fn to_xlsx<T: Row>(
    columns: &[Column<T>],
    rows: &[T],
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    use rust_xlsxwriter::{Workbook, Worksheet};

    let columns = resolve_columns(columns, rows);
    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();

    for (c, column) in columns.iter().enumerate() {
        worksheet.write_string(0, u16::try_from(c)?, column.title())?;
    }

    for (r, row) in rows.iter().enumerate() {
        let xlsx_row = u32::try_from(r + 1)?;
        for (c, column) in columns.iter().enumerate() {
            let xlsx_col = u16::try_from(c)?;
            match column.value_of(row) {
                CellValue::Null => {}
                CellValue::Bool(b) => {
                    worksheet.write_boolean(xlsx_row, xlsx_col, b)?;
                }
                CellValue::Number(n) if n.is_finite() => {
                    worksheet.write_number(xlsx_row, xlsx_col, n)?;
                }
                other => {
                    worksheet.write_string(xlsx_row, xlsx_col, other.to_display_string().as_str())?;
                }
            }
        }
    }

    workbook.push_worksheet(worksheet);
    let buffer = workbook.save_to_buffer()?;
    Ok(buffer)
}

/// Build an XLSX file for download
#[cfg(feature = "web")]
pub fn download_xlsx<T: Row>(
    filename: &str,
    columns: &[Column<T>],
    rows: &[T],
) -> Result<Download, Box<dyn std::error::Error>> {
    let bytes = to_xlsx(columns, rows)?;
    log::debug!("prepared XLSX export {} ({} rows)", filename, rows.len());
    Ok(Download {
        filename: filename.to_string(),
        content_type: XLSX_CONTENT_TYPE,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Record;

    #[test]
    fn plain_values_are_verbatim() {
        assert_eq!(escape_csv_cell(&"R-1001".into()), "R-1001");
        assert_eq!(escape_csv_cell(&CellValue::Number(12.5)), "12.5");
        assert_eq!(escape_csv_cell(&CellValue::Bool(false)), "false");
    }

    #[test]
    fn surrounding_whitespace_forces_quotes() {
        assert_eq!(escape_csv_cell(&" padded".into()), "\" padded\"");
        assert_eq!(escape_csv_cell(&"padded\t".into()), "\"padded\t\"");
        assert_eq!(escape_csv_cell(&"in side".into()), "in side");
    }

    #[test]
    fn line_breaks_force_quotes() {
        assert_eq!(escape_csv_cell(&"a\nb".into()), "\"a\nb\"");
        assert_eq!(escape_csv_cell(&"a\rb".into()), "\"a\rb\"");
    }

    #[test]
    fn blank_columns_are_ignored() {
        let rows = vec![Record::new().with("a", 1).with("b", 2)];
        let columns = vec![Column::new("", ""), Column::new("b", "")];
        assert_eq!(to_csv(&columns, &rows), "b\r\n2");
    }

    #[test]
    fn only_blank_columns_fall_back_to_inference() {
        let rows = vec![Record::new().with("a", 1)];
        let columns: Vec<Column<Record>> = vec![Column::new("", "")];
        assert_eq!(to_csv(&columns, &rows), "a\r\n1");
    }

    #[test]
    fn empty_input_is_empty_output() {
        let rows: Vec<Record> = Vec::new();
        assert_eq!(to_csv(&[], &rows), "");
    }

    #[cfg(feature = "web")]
    #[test]
    fn xlsx_rejects_columns_past_the_sheet_limit() {
        let rows = vec![Record::new().with("a", 1)];
        let columns: Vec<Column<Record>> = (0..=16_384)
            .map(|i| Column::new(format!("c{}", i), ""))
            .collect();
        assert!(to_xlsx(&columns, &rows).is_err());
        assert!(to_xlsx(&columns[..3], &rows).is_ok());
    }

    #[test]
    fn save_to_strips_directories() {
        let dir = tempfile::tempdir().unwrap();
        let download = Download {
            filename: "../escape/report.csv".to_string(),
            content_type: CSV_CONTENT_TYPE,
            bytes: b"a\r\n1".to_vec(),
        };
        let path = download.save_to(dir.path()).unwrap();
        assert_eq!(path, dir.path().join("report.csv"));
        assert_eq!(fs::read(path).unwrap(), b"a\r\n1");
    }
}

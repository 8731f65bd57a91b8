// 📄 Raw Table - Header-less grid of cells as read from a statement export
// No header is assumed; the header locator decides where the data starts

use crate::error::{IngestError, Result};
use calamine::{open_workbook_auto, Data, Reader};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fs;
use std::path::Path;

// ============================================================================
// CELL
// ============================================================================

/// One cell of a statement export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Build a cell from raw text; blank text becomes `Empty`.
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value)
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(n) => n.is_nan(),
        }
    }

    /// Display form used for matching and error reporting.
    /// Integral numbers print without a fractional part.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Cell::Empty => Cow::Borrowed(""),
            Cell::Text(s) => Cow::Borrowed(s.as_str()),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                Cow::Owned(format!("{}", *n as i64))
            }
            Cell::Number(n) => Cow::Owned(n.to_string()),
        }
    }

    /// Trimmed text, or `None` for empty cells.
    pub fn trimmed(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        Some(self.as_text().trim().to_string())
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

// ============================================================================
// RAW TABLE
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        RawTable { rows }
    }

    /// Convenience constructor from text rows.
    pub fn from_text_rows<R, S>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|s| Cell::text(s.as_ref())).collect())
            .collect();
        RawTable { rows }
    }

    /// Load a statement export from disk, picking the reader by extension.
    /// Workbooks go through `from_workbook_path`; `.csv`, `.txt` and
    /// extension-less files are read as CSV.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        tracing::debug!(path = %path.display(), extension = %extension, "loading statement");

        match extension.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Self::from_workbook_path(path),
            "csv" | "txt" | "" => Self::from_csv_path(path),
            _ => Err(IngestError::UnsupportedFile {
                path: path.to_path_buf(),
                extension,
            }),
        }
    }

    /// Read the first worksheet of a workbook. Numeric and date cells stay
    /// numeric (dates as spreadsheet serials) so the date normalizer sees
    /// what the exporter wrote.
    pub fn from_workbook_path(path: &Path) -> Result<Self> {
        let workbook_error = |source: calamine::Error| IngestError::Workbook {
            path: path.to_path_buf(),
            source,
        };

        let mut workbook = open_workbook_auto(path).map_err(workbook_error)?;
        let Some(sheet) = workbook.sheet_names().first().cloned() else {
            return Ok(RawTable::default());
        };
        let range = workbook.worksheet_range(&sheet).map_err(workbook_error)?;

        // Keep sheet coordinates when the used range does not start at A1
        let (start_row, start_col) = range.start().unwrap_or((0, 0));
        let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); start_row as usize];
        for row in range.rows() {
            let mut cells = vec![Cell::Empty; start_col as usize];
            cells.extend(row.iter().map(workbook_cell));
            rows.push(cells);
        }

        tracing::debug!(sheet = %sheet, rows = rows.len(), "workbook sheet loaded");
        Ok(RawTable { rows })
    }

    /// Load a CSV export from disk.
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|source| IngestError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_csv_bytes(&bytes).map_err(|err| match err {
            IngestError::Csv { source, .. } => IngestError::Csv {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse CSV bytes without assuming a header row. Rows may differ in width.
    /// UTF-8 is tried first, then windows-1255 for legacy Hebrew exports.
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self> {
        let text = decode_text(bytes);

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|source| IngestError::Csv {
                path: Default::default(),
                source,
            })?;
            rows.push(record.iter().map(Cell::text).collect());
        }

        Ok(RawTable { rows })
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[Cell]> {
        self.rows.get(index).map(|r| r.as_slice())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn workbook_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::text(s.as_str()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::text(b.to_string()),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
    }
}

fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            let (text, had_errors) = encoding_rs::WINDOWS_1255.decode_without_bom_handling(bytes);
            if had_errors {
                tracing::warn!("input is neither UTF-8 nor clean windows-1255; some characters were replaced");
            }
            text
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_text_blank_is_empty() {
        assert_eq!(Cell::text("   "), Cell::Empty);
        assert!(Cell::Number(f64::NAN).is_empty());
        assert!(!Cell::text("x").is_empty());
    }

    #[test]
    fn test_number_cell_display() {
        assert_eq!(Cell::Number(45292.0).as_text(), "45292");
        assert_eq!(Cell::Number(12.5).as_text(), "12.5");
    }

    #[test]
    fn test_csv_without_header_and_ragged_rows() {
        let csv = "Statement,,\n\nDate,Business,Amount\n05/03/2025,Cafe,150\n";
        let table = RawTable::from_csv_bytes(csv.as_bytes()).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.row(0).unwrap()[0], Cell::Text("Statement".to_string()));
        assert_eq!(table.row(0).unwrap()[1], Cell::Empty);
        assert_eq!(table.row(2).unwrap()[2], Cell::Text("150".to_string()));
    }

    #[test]
    fn test_csv_utf8_bom_stripped() {
        let csv = "\u{feff}תאריך,סכום\n";
        let table = RawTable::from_csv_bytes(csv.as_bytes()).unwrap();
        assert_eq!(table.row(0).unwrap()[0], Cell::Text("תאריך".to_string()));
    }

    #[test]
    fn test_csv_windows_1255_fallback() {
        let (encoded, _, _) = encoding_rs::WINDOWS_1255.encode("תאריך,סכום\n");
        let table = RawTable::from_csv_bytes(&encoded).unwrap();
        assert_eq!(table.row(0).unwrap()[1], Cell::Text("סכום".to_string()));
    }

    #[test]
    fn test_workbook_keeps_numbers_and_serial_dates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("statement.xlsx");

        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "תאריך עסקה").unwrap();
        sheet.write_string(0, 1, "שם בית העסק").unwrap();
        sheet.write_string(0, 2, "סכום חיוב").unwrap();
        sheet.write_number(1, 0, 45721.0).unwrap();
        sheet.write_string(1, 1, "Cafe").unwrap();
        sheet.write_number(1, 2, 12.5).unwrap();
        workbook.save(&path).unwrap();

        let table = RawTable::from_path(&path).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.row(0).unwrap()[0], Cell::Text("תאריך עסקה".to_string()));
        assert_eq!(table.row(1).unwrap()[0], Cell::Number(45721.0));
        assert_eq!(table.row(1).unwrap()[1], Cell::Text("Cafe".to_string()));
        assert_eq!(table.row(1).unwrap()[2], Cell::Number(12.5));
    }

    #[test]
    fn test_from_path_dispatches_csv_and_rejects_unknown() {
        let dir = tempfile::tempdir().unwrap();

        let csv_path = dir.path().join("statement.CSV");
        fs::write(&csv_path, "Date,Amount\n05/03/2025,10\n").unwrap();
        assert_eq!(RawTable::from_path(&csv_path).unwrap().len(), 2);

        let pdf_path = dir.path().join("statement.pdf");
        fs::write(&pdf_path, b"%PDF-1.4").unwrap();
        assert!(matches!(
            RawTable::from_path(&pdf_path),
            Err(IngestError::UnsupportedFile { ref extension, .. }) if extension == "pdf"
        ));
    }
}

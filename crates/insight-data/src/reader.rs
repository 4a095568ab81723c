//! Source loading and tabular decoding.
//!
//! The source file is read into memory in one scoped acquisition; decoding
//! then turns the buffer into rows of [`CellValue`]s (first row = header).
//! Spreadsheet formats go through `calamine`, delimited text through `csv`.

use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use insight_core::error::{InsightError, Result};
use insight_core::models::{CellValue, RawRow};
use tracing::debug;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

// ── SourceFormat ──────────────────────────────────────────────────────────────

/// How an input buffer is decoded into rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Any workbook `calamine` can auto-detect (xlsx, xlsm, xlsb, xls, ods).
    Workbook,
    /// Delimited text with the given field separator.
    Delimited { delimiter: u8 },
}

impl SourceFormat {
    /// Pick a format from the file extension; unknown extensions are
    /// treated as workbooks.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("csv") => SourceFormat::Delimited { delimiter: b',' },
            Some("tsv") | Some("tab") => SourceFormat::Delimited { delimiter: b'\t' },
            _ => SourceFormat::Workbook,
        }
    }

    /// Decode `bytes` into the first sheet's rows.
    pub fn decode(&self, bytes: &[u8]) -> Result<Vec<RawRow>> {
        match self {
            SourceFormat::Workbook => read_first_sheet(bytes),
            SourceFormat::Delimited { delimiter } => read_delimited(bytes, *delimiter),
        }
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Read the whole source file into memory. The file handle is released
/// before this returns.
pub fn read_source(path: &Path) -> Result<Vec<u8>> {
    let bytes = std::fs::read(path).map_err(|source| InsightError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(bytes)
}

/// Decode a workbook buffer and return the first sheet as rows.
pub fn read_first_sheet(bytes: &[u8]) -> Result<Vec<RawRow>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| InsightError::WorkbookDecode(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(InsightError::NoSheets)?
        .map_err(|e| InsightError::WorkbookDecode(e.to_string()))?;

    let rows: Vec<RawRow> = range
        .rows()
        .map(|row| row.iter().map(map_cell).collect())
        .collect();

    debug!("Decoded {} rows from first worksheet", rows.len());
    Ok(rows)
}

/// Decode delimited text. Fields that parse as finite numbers become
/// [`CellValue::Number`], empty fields [`CellValue::Empty`].
pub fn read_delimited(bytes: &[u8], delimiter: u8) -> Result<Vec<RawRow>> {
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(body);

    let mut rows = Vec::new();
    for record in reader.byte_records() {
        let record = record.map_err(|e| InsightError::WorkbookDecode(e.to_string()))?;
        rows.push(
            record
                .iter()
                .map(|field| map_text_field(&String::from_utf8_lossy(field)))
                .collect(),
        );
    }

    debug!("Decoded {} delimited rows", rows.len());
    Ok(rows)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Map a decoded workbook cell onto the closed cell model.
fn map_cell(cell: &Data) -> CellValue {
    match cell {
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::Error(_) | Data::Empty => CellValue::Empty,
    }
}

fn map_text_field(field: &str) -> CellValue {
    if field.is_empty() {
        return CellValue::Empty;
    }
    let trimmed = field.trim();
    if trimmed.bytes().any(|b| b.is_ascii_digit()) {
        if let Ok(n) = trimmed.parse::<f64>() {
            if n.is_finite() {
                return CellValue::Number(n);
            }
        }
    }
    CellValue::Text(field.to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

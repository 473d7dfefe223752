//! Delimited tables
//!
//! Loading of the raw source tables and persistence of computed results.
//! Every function opens and closes its own file handle.

use std::fs::File;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{AnalysisError, Result};
use crate::matrix::SimilarityMatrix;

/// Delimiter used for everything this crate writes
pub const OUTPUT_DELIMITER: u8 = b',';

/// Untyped table as read from disk: header row plus string cells
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    name: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Frame {
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    pub fn has_columns(&self, columns: &[&str]) -> bool {
        columns.iter().all(|c| self.column_index(c).is_some())
    }

    /// Resolves every column up front; the first absent one is an error
    pub fn require_columns(&self, columns: &[&str]) -> Result<Vec<usize>> {
        columns
            .iter()
            .map(|column| {
                self.column_index(column)
                    .ok_or_else(|| AnalysisError::MissingColumn {
                        table: self.name.clone(),
                        column: column.to_string(),
                    })
            })
            .collect()
    }

    /// Cell text, empty for short rows
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows[row].get(column).map(String::as_str).unwrap_or("")
    }
}

/// Reads a delimited file with a header row
pub fn read_frame(path: impl AsRef<Path>, delimiter: u8) -> Result<Frame> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(AnalysisError::MissingFile(path.to_path_buf()));
    }

    let file = File::open(path).map_err(|e| AnalysisError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let headers = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    debug!(table = %name, rows = rows.len(), columns = headers.len(), "table loaded");
    Ok(Frame::new(name, headers, rows))
}

/// Writes a frame back out, headers first
pub fn write_frame(path: impl AsRef<Path>, frame: &Frame, delimiter: u8) -> Result<()> {
    let path = path.as_ref();
    let mut writer = open_writer(path, delimiter)?;
    writer.write_record(frame.headers())?;
    for row in frame.rows() {
        writer.write_record(row)?;
    }
    writer.flush().map_err(|e| AnalysisError::io(path, e))?;
    info!(path = %path.display(), rows = frame.len(), "table written");
    Ok(())
}

/// Persists a similarity matrix as a square table with label headers.
///
/// The corner cell is empty; NaN cells are written empty.
pub fn write_similarity_matrix(path: impl AsRef<Path>, matrix: &SimilarityMatrix) -> Result<()> {
    let path = path.as_ref();
    let mut writer = open_writer(path, OUTPUT_DELIMITER)?;

    let mut header = Vec::with_capacity(matrix.len() + 1);
    header.push(String::new());
    header.extend(matrix.labels().iter().cloned());
    writer.write_record(&header)?;

    for (i, label) in matrix.labels().iter().enumerate() {
        let mut row = Vec::with_capacity(matrix.len() + 1);
        row.push(label.clone());
        row.extend(matrix.row(i).iter().map(|&v| format_cell(v)));
        writer.write_record(&row)?;
    }

    writer.flush().map_err(|e| AnalysisError::io(path, e))?;
    info!(path = %path.display(), items = matrix.len(), "similarity matrix written");
    Ok(())
}

/// Inverse of [`write_similarity_matrix`]
pub fn read_similarity_matrix(path: impl AsRef<Path>) -> Result<SimilarityMatrix> {
    let frame = read_frame(path, OUTPUT_DELIMITER)?;
    let labels: Vec<String> = frame.headers().iter().skip(1).cloned().collect();

    let mut rows = Vec::with_capacity(frame.len());
    for (i, raw) in frame.rows().iter().enumerate() {
        let row_label = raw.first().map(String::as_str).unwrap_or("");
        if labels.get(i).map(String::as_str) != Some(row_label) {
            return Err(AnalysisError::invalid_value(
                "row label",
                row_label,
                format!("expected '{}'", labels.get(i).map(String::as_str).unwrap_or("")),
            ));
        }
        let values = raw
            .iter()
            .skip(1)
            .map(|cell| parse_cell(row_label, cell))
            .collect::<Result<Vec<f64>>>()?;
        rows.push(values);
    }

    SimilarityMatrix::from_rows(labels, rows)
}

/// Writes a small summary table, e.g. `(ps_id, count, url)` rows
pub fn write_table(
    path: impl AsRef<Path>,
    headers: &[&str],
    rows: impl IntoIterator<Item = Vec<String>>,
) -> Result<()> {
    let path = path.as_ref();
    let mut writer = open_writer(path, OUTPUT_DELIMITER)?;
    writer.write_record(headers)?;
    let mut written = 0usize;
    for row in rows {
        writer.write_record(&row)?;
        written += 1;
    }
    writer.flush().map_err(|e| AnalysisError::io(path, e))?;
    info!(path = %path.display(), rows = written, "summary written");
    Ok(())
}

fn open_writer(path: &Path, delimiter: u8) -> Result<csv::Writer<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| AnalysisError::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| AnalysisError::io(path, e))?;
    Ok(csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(file))
}

fn format_cell(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

fn parse_cell(row_label: &str, cell: &str) -> Result<f64> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    cell.parse::<f64>()
        .map_err(|e| AnalysisError::invalid_value(row_label, cell, e.to_string()))
}

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("table '{table}' is missing required column '{column}'")]
    MissingColumn { table: String, column: String },
    #[error("input file not found: {0}")]
    MissingFile(PathBuf),
    #[error("invalid value '{value}' in column '{column}': {reason}")]
    InvalidValue {
        column: String,
        value: String,
        reason: String,
    },
    #[error("malformed template '{template}': expected exactly one blank, found {markers}")]
    MalformedTemplate { template: String, markers: usize },
    #[error("record {record_id} has no {field}")]
    MissingField { record_id: i64, field: &'static str },
    #[error("unknown similarity method: {0}")]
    UnknownMethod(String),
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("matrices '{first}' and '{other}' share no labels and differ in size")]
    LabelMismatch { first: String, other: String },
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl AnalysisError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AnalysisError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_value(column: &str, value: &str, reason: impl Into<String>) -> Self {
        AnalysisError::InvalidValue {
            column: column.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Configuration problems abort a run and are never retried.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AnalysisError::MissingColumn { .. }
                | AnalysisError::MissingFile(_)
                | AnalysisError::UnknownMethod(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

//! Error types for the vigil-ingest pipeline.
//!
//! Every row-level variant carries the 1-based data row number (the header
//! is not counted) so the caller can show which row failed.

use thiserror::Error;

/// The uploaded file could not be turned into rows.
#[derive(Debug, Error)]
pub enum ParseError {
  #[error("missing required column(s): {}", .0.join(", "))]
  MissingColumns(Vec<&'static str>),

  #[error("unreadable header row: {0}")]
  Header(String),

  #[error("row {row}: unreadable record: {message}")]
  Malformed { row: usize, message: String },

  #[error("row {row}: student_id is empty")]
  EmptyStudentId { row: usize },

  #[error("row {row}: {column} is not a number: {value:?}")]
  InvalidNumber {
    row:    usize,
    column: &'static str,
    value:  String,
  },

  #[error("row {row}: {column} must be between 0 and 100, got {value}")]
  OutOfRange {
    row:    usize,
    column: &'static str,
    value:  f64,
  },
}

/// An upload failed; nothing was written.
#[derive(Debug, Error)]
pub enum IngestError {
  #[error(transparent)]
  Parse(#[from] ParseError),

  #[error("row {row} ({student_id}): risk prediction failed: {source}")]
  Inference {
    row:        usize,
    student_id: String,
    #[source]
    source:     Box<dyn std::error::Error + Send + Sync>,
  },

  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl IngestError {
  /// The failing data row, when the error is tied to one.
  pub fn row(&self) -> Option<usize> {
    match self {
      Self::Parse(
        ParseError::Malformed { row, .. }
        | ParseError::EmptyStudentId { row }
        | ParseError::InvalidNumber { row, .. }
        | ParseError::OutOfRange { row, .. },
      )
      | Self::Inference { row, .. } => Some(*row),
      _ => None,
    }
  }
}

//! CSV upload-and-classify pipeline for Vigil.
//!
//! Turns an uploaded performance sheet into classified
//! [`StudentRecord`]s and writes them through any [`StudentStore`].
//!
//! Uploads are all-or-nothing: every row is parsed and classified before the
//! store is touched, and the write itself is a single atomic batch. The first
//! failing row aborts the upload and is named in the error.
//!
//! # Quick start
//!
//! ```no_run
//! # async fn run<S, C>(store: &S, model: &C) -> Result<(), vigil_ingest::IngestError>
//! # where S: vigil_core::store::StudentStore, C: vigil_core::classify::Classifier {
//! let csv = b"student_id,name,attendance,avg_marks,assignment_completion,behavior_score\n\
//!             S1,A,90,85,100,80\n";
//! let report = vigil_ingest::ingest(store, model, csv).await?;
//! assert_eq!(report.rows, 1);
//! # Ok(()) }
//! ```

pub mod error;
mod parse;

use std::{collections::BTreeMap, time::Instant};

pub use error::{IngestError, ParseError};
pub use parse::REQUIRED_COLUMNS;
use serde::Serialize;
use vigil_core::{
  classify::Classifier,
  store::StudentStore,
  student::{Features, StudentRecord},
};

// ─── Public types
// ─────────────────────────────────────────────────────────────

/// One data row of an upload, before classification.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRow {
  /// 1-based data row number; the header is not counted.
  pub row:        usize,
  pub student_id: String,
  pub name:       String,
  pub features:   Features,
}

/// Outcome of a successful upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
  /// Number of data rows written (duplicates within the file included).
  pub rows:        usize,
  /// Predicted labels across the uploaded rows.
  pub risk_counts: BTreeMap<String, usize>,
}

// ─── Public API
// ───────────────────────────────────────────────────────────────

/// Parse a comma-separated upload with a header row.
///
/// Required columns are matched by name in any order; extra columns
/// (including any `risk` column) are ignored.
pub fn parse(input: &[u8]) -> Result<Vec<UploadRow>, ParseError> {
  parse::parse_rows(input)
}

/// Classify every row, stopping at the first prediction failure.
pub fn classify_rows<C>(
  rows: Vec<UploadRow>,
  classifier: &C,
) -> Result<Vec<StudentRecord>, IngestError>
where
  C: Classifier + ?Sized,
{
  rows
    .into_iter()
    .map(|r| {
      let risk = classifier.classify(&r.features).map_err(|e| {
        IngestError::Inference {
          row:        r.row,
          student_id: r.student_id.clone(),
          source:     Box::new(e),
        }
      })?;
      Ok(StudentRecord {
        student_id: r.student_id,
        name: r.name,
        features: r.features,
        risk,
      })
    })
    .collect()
}

/// Run the full pipeline: parse, classify every row, then upsert the batch.
pub async fn ingest<S, C>(
  store: &S,
  classifier: &C,
  input: &[u8],
) -> Result<IngestReport, IngestError>
where
  S: StudentStore,
  C: Classifier + ?Sized,
{
  let started = Instant::now();
  let rows = parse(input)?;
  let records = classify_rows(rows, classifier)?;

  let mut risk_counts = BTreeMap::new();
  for record in &records {
    *risk_counts.entry(record.risk.clone()).or_insert(0) += 1;
  }

  let written = store
    .upsert_students(records)
    .await
    .map_err(|e| IngestError::Storage(Box::new(e)))?;

  tracing::info!(
    rows = written,
    elapsed_ms = started.elapsed().as_millis() as u64,
    "upload ingested"
  );

  Ok(IngestReport { rows: written, risk_counts })
}

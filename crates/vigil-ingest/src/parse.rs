//! CSV upload parser.
//!
//! Pipeline:
//!   raw bytes
//!     └─ locate_columns()   → column index per required header
//!          └─ parse_record() → UploadRow (one per data row)

use csv::{ReaderBuilder, StringRecord, Trim};
use vigil_core::student::Features;

use crate::{UploadRow, error::ParseError};

/// Header names every upload must carry, matched exactly after trimming.
/// Order in the file does not matter.
pub const REQUIRED_COLUMNS: [&str; 6] = [
  "student_id",
  "name",
  "attendance",
  "avg_marks",
  "assignment_completion",
  "behavior_score",
];

/// Position of each [`REQUIRED_COLUMNS`] entry within a record.
struct Columns([usize; REQUIRED_COLUMNS.len()]);

fn locate_columns(headers: &StringRecord) -> Result<Columns, ParseError> {
  let mut positions = [0usize; REQUIRED_COLUMNS.len()];
  let mut missing = Vec::new();

  for (slot, name) in positions.iter_mut().zip(REQUIRED_COLUMNS) {
    match headers.iter().position(|h| h == name) {
      Some(i) => *slot = i,
      None => missing.push(name),
    }
  }

  if missing.is_empty() {
    Ok(Columns(positions))
  } else {
    Err(ParseError::MissingColumns(missing))
  }
}

pub(crate) fn parse_rows(input: &[u8]) -> Result<Vec<UploadRow>, ParseError> {
  let mut reader = ReaderBuilder::new()
    .has_headers(true)
    .trim(Trim::All)
    .from_reader(input);

  let headers = reader
    .headers()
    .map_err(|e| ParseError::Header(e.to_string()))?
    .clone();
  let columns = locate_columns(&headers)?;

  let mut rows = Vec::new();
  for (i, result) in reader.records().enumerate() {
    let row = i + 1;
    let record = result.map_err(|e| ParseError::Malformed {
      row,
      message: e.to_string(),
    })?;
    rows.push(parse_record(row, &record, &columns)?);
  }
  Ok(rows)
}

fn parse_record(
  row:     usize,
  record:  &StringRecord,
  columns: &Columns,
) -> Result<UploadRow, ParseError> {
  let [id_col, name_col, att_col, marks_col, done_col, behav_col] = columns.0;
  let field = |i: usize| record.get(i).unwrap_or_default();

  let student_id = field(id_col);
  if student_id.is_empty() {
    return Err(ParseError::EmptyStudentId { row });
  }

  let features = Features {
    attendance:            percentage(row, "attendance", field(att_col))?,
    avg_marks:             number(row, "avg_marks", field(marks_col))?,
    assignment_completion: percentage(
      row,
      "assignment_completion",
      field(done_col),
    )?,
    behavior_score:        number(row, "behavior_score", field(behav_col))?,
  };

  Ok(UploadRow {
    row,
    student_id: student_id.to_owned(),
    name: field(name_col).to_owned(),
    features,
  })
}

fn number(row: usize, column: &'static str, raw: &str) -> Result<f64, ParseError> {
  raw
    .parse::<f64>()
    .ok()
    .filter(|v| v.is_finite())
    .ok_or_else(|| ParseError::InvalidNumber {
      row,
      column,
      value: raw.to_owned(),
    })
}

fn percentage(row: usize, column: &'static str, raw: &str) -> Result<f64, ParseError> {
  let value = number(row, column, raw)?;
  if (0.0..=100.0).contains(&value) {
    Ok(value)
  } else {
    Err(ParseError::OutOfRange { row, column, value })
  }
}

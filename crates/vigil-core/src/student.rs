//! Student records and the cohort summary derived from them.
//!
//! A record is written whole on every upload; there is no partial update and
//! no history. The `risk` label is always produced by the classifier from the
//! four numeric fields, never taken from the uploaded file.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ─── Features ────────────────────────────────────────────────────────────────

/// Names of the model inputs, in the order they are fed to the classifier.
pub const FEATURE_NAMES: [&str; 4] = [
  "attendance",
  "avg_marks",
  "assignment_completion",
  "behavior_score",
];

/// The four numeric inputs of the risk classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Features {
  /// Percentage of sessions attended, 0–100.
  pub attendance:            f64,
  pub avg_marks:             f64,
  /// Percentage of assignments handed in, 0–100.
  pub assignment_completion: f64,
  pub behavior_score:        f64,
}

impl Features {
  /// The feature vector in [`FEATURE_NAMES`] order.
  pub fn to_array(&self) -> [f64; 4] {
    [
      self.attendance,
      self.avg_marks,
      self.assignment_completion,
      self.behavior_score,
    ]
  }
}

// ─── StudentRecord ───────────────────────────────────────────────────────────

/// One row of the `students` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
  pub student_id: String,
  pub name:       String,
  #[serde(flatten)]
  pub features:   Features,
  /// Classifier output for `features` at the time of the last upsert.
  pub risk:       String,
}

// ─── Cohort summary ──────────────────────────────────────────────────────────

/// Arithmetic means of each numeric field over all stored records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Averages {
  pub attendance:            f64,
  pub avg_marks:             f64,
  pub assignment_completion: f64,
  pub behavior_score:        f64,
}

impl Averages {
  /// The four means in [`FEATURE_NAMES`] order, as plotted on the dashboard.
  pub fn chart_data(&self) -> [f64; 4] {
    [
      self.attendance,
      self.avg_marks,
      self.assignment_completion,
      self.behavior_score,
    ]
  }
}

/// The teacher dashboard's read model — never stored, always derived.
///
/// With no records every average is `0.0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CohortSummary {
  pub student_count: usize,
  pub averages:      Averages,
  /// Number of records per risk label.
  pub risk_counts:   BTreeMap<String, usize>,
}

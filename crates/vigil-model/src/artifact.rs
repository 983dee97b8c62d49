//! On-disk shape of the model bundle and its load-time validation.

use serde::Deserialize;
use vigil_core::student::FEATURE_NAMES;

use crate::{Error, Result};

const N_FEATURES: usize = FEATURE_NAMES.len();

// ─── Bundle ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawBundle {
  /// Optional sanity check against the fixed feature order.
  #[serde(default)]
  pub feature_names: Option<Vec<String>>,
  #[serde(default)]
  pub scaler:        Option<Scaler>,
  pub model:         Model,
  pub label_encoder: LabelEncoder,
}

/// Standardisation applied before scoring: `(x - mean) / scale`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Scaler {
  pub mean:  [f64; N_FEATURES],
  pub scale: [f64; N_FEATURES],
}

/// Maps encoded class indices back to label strings.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LabelEncoder {
  pub classes: Vec<String>,
}

// ─── Models ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum Model {
  /// One coefficient row per class; a single row is the binary case.
  Logistic {
    coefficients: Vec<[f64; N_FEATURES]>,
    intercepts:   Vec<f64>,
  },
  /// Majority vote over decision trees.
  Forest { trees: Vec<Tree> },
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Tree {
  /// Node 0 is the root.
  pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Node {
  /// Go to `left` when `x[feature] <= threshold`, else `right`.
  Split {
    feature:   usize,
    threshold: f64,
    left:      usize,
    right:     usize,
  },
  Leaf { class: usize },
}

// ─── Validation ──────────────────────────────────────────────────────────────

fn invalid(msg: impl Into<String>) -> Error { Error::InvalidArtifact(msg.into()) }

impl RawBundle {
  pub fn validate(&self) -> Result<()> {
    let n_classes = self.label_encoder.classes.len();
    if n_classes == 0 {
      return Err(invalid("label encoder has no classes"));
    }

    if let Some(names) = &self.feature_names
      && names.iter().map(String::as_str).ne(FEATURE_NAMES)
    {
      return Err(invalid(format!(
        "feature order {names:?} does not match {FEATURE_NAMES:?}"
      )));
    }

    if let Some(scaler) = &self.scaler {
      let all_finite = scaler.mean.iter().chain(&scaler.scale).all(|v| v.is_finite());
      if !all_finite || scaler.scale.contains(&0.0) {
        return Err(invalid("scaler must be finite with non-zero scale"));
      }
    }

    match &self.model {
      Model::Logistic { coefficients, intercepts } => {
        validate_logistic(coefficients, intercepts, n_classes)
      }
      Model::Forest { trees } => {
        if trees.is_empty() {
          return Err(invalid("forest has no trees"));
        }
        trees
          .iter()
          .enumerate()
          .try_for_each(|(i, t)| t.validate(n_classes).map_err(|e| invalid(format!("tree {i}: {e}"))))
      }
    }
  }
}

fn validate_logistic(
  coefficients: &[[f64; N_FEATURES]],
  intercepts:   &[f64],
  n_classes:    usize,
) -> Result<()> {
  if n_classes < 2 {
    return Err(invalid(format!(
      "logistic model needs at least 2 classes, got {n_classes}"
    )));
  }
  let rows = coefficients.len();
  let expected = if n_classes == 2 { [1, 2] } else { [n_classes, n_classes] };
  if !expected.contains(&rows) {
    return Err(invalid(format!(
      "{rows} coefficient rows for {n_classes} classes"
    )));
  }
  if intercepts.len() != rows {
    return Err(invalid(format!(
      "{} intercepts for {rows} coefficient rows",
      intercepts.len()
    )));
  }
  let finite = coefficients.iter().flatten().chain(intercepts).all(|v| v.is_finite());
  if !finite {
    return Err(invalid("coefficients and intercepts must be finite"));
  }
  Ok(())
}

impl Tree {
  fn validate(&self, n_classes: usize) -> Result<(), String> {
    if self.nodes.is_empty() {
      return Err("tree has no nodes".into());
    }
    for (i, node) in self.nodes.iter().enumerate() {
      match *node {
        Node::Split { feature, threshold, left, right } => {
          if feature >= N_FEATURES {
            return Err(format!("node {i} splits on unknown feature {feature}"));
          }
          if threshold.is_nan() {
            return Err(format!("node {i} has a NaN threshold"));
          }
          // Children strictly after the parent rules out cycles.
          for child in [left, right] {
            if child <= i || child >= self.nodes.len() {
              return Err(format!("node {i} has invalid child {child}"));
            }
          }
        }
        Node::Leaf { class } => {
          if class >= n_classes {
            return Err(format!("node {i} predicts unknown class {class}"));
          }
        }
      }
    }
    Ok(())
  }
}

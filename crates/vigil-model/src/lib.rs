//! Risk-model inference adapter for Vigil.
//!
//! Loads a frozen classifier bundle (`{model, label_encoder}`) exported from
//! the training pipeline and exposes it through
//! [`vigil_core::classify::Classifier`]. Pure synchronous; the bundle is
//! loaded once at startup and shared read-only behind an `Arc`.
//!
//! # Artifact
//!
//! ```json
//! {
//!   "feature_names": ["attendance", "avg_marks", "assignment_completion", "behavior_score"],
//!   "scaler": { "mean": [75, 60, 80, 70], "scale": [15, 12, 20, 10] },
//!   "model": {
//!     "kind": "logistic",
//!     "coefficients": [[-0.1, -0.1, -0.05, -0.05], [0.1, 0.1, 0.05, 0.05], [0, 0, 0, 0]],
//!     "intercepts": [0.0, 0.0, 0.5]
//!   },
//!   "label_encoder": { "classes": ["High", "Low", "Medium"] }
//! }
//! ```
//!
//! `model.kind` may also be `"forest"` with a list of decision trees.

mod artifact;
pub mod error;

use std::path::Path;

pub use error::{Error, Result};
use vigil_core::{
  classify::Classifier,
  student::{FEATURE_NAMES, Features},
};

use artifact::{Model, Node, RawBundle, Tree};

/// A validated, ready-to-use risk model.
#[derive(Debug, Clone)]
pub struct ModelBundle {
  inner: RawBundle,
}

impl ModelBundle {
  /// Read and validate the artifact at `path`.
  pub fn load(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
      path: path.to_path_buf(),
      source,
    })?;
    let bundle = Self::from_json(&text)?;
    tracing::info!(
      path = %path.display(),
      classes = ?bundle.classes(),
      "loaded risk model"
    );
    Ok(bundle)
  }

  /// Parse and validate an artifact held in memory.
  pub fn from_json(text: &str) -> Result<Self> {
    let inner: RawBundle = serde_json::from_str(text)?;
    inner.validate()?;
    Ok(Self { inner })
  }

  /// The labels this model can emit, in encoder order.
  pub fn classes(&self) -> &[String] { &self.inner.label_encoder.classes }

  /// Predict the encoded class index for a raw feature vector.
  fn predict_index(&self, features: &Features) -> Result<usize> {
    let mut x = features.to_array();
    for (name, value) in FEATURE_NAMES.into_iter().zip(x) {
      if !value.is_finite() {
        return Err(Error::NonFiniteFeature { name, value });
      }
    }

    if let Some(scaler) = &self.inner.scaler {
      for (i, v) in x.iter_mut().enumerate() {
        *v = (*v - scaler.mean[i]) / scaler.scale[i];
      }
    }

    match &self.inner.model {
      Model::Logistic { coefficients, intercepts } => {
        let scores: Vec<f64> = coefficients
          .iter()
          .zip(intercepts)
          .map(|(row, b)| row.iter().zip(&x).map(|(w, v)| w * v).sum::<f64>() + b)
          .collect();
        if scores.iter().any(|s| !s.is_finite()) {
          return Err(Error::NonFiniteScore);
        }
        if let [score] = scores.as_slice() {
          return Ok(usize::from(*score > 0.0));
        }
        Ok(argmax(&scores))
      }
      Model::Forest { trees } => {
        let mut votes = vec![0usize; self.classes().len()];
        for tree in trees {
          votes[tree.predict(&x)] += 1;
        }
        Ok(argmax(&votes))
      }
    }
  }
}

impl Classifier for ModelBundle {
  type Error = Error;

  fn classify(&self, features: &Features) -> Result<String> {
    let index = self.predict_index(features)?;
    // Validation guarantees every reachable index is within the encoder.
    self
      .classes()
      .get(index)
      .cloned()
      .ok_or_else(|| Error::InvalidArtifact(format!("class index {index} out of range")))
  }
}

impl Tree {
  fn predict(&self, x: &[f64; 4]) -> usize {
    let mut i = 0;
    loop {
      match self.nodes[i] {
        Node::Leaf { class } => return class,
        Node::Split { feature, threshold, left, right } => {
          i = if x[feature] <= threshold { left } else { right };
        }
      }
    }
  }
}

/// Index of the largest value; ties go to the lowest index.
fn argmax<T: PartialOrd + Copy>(values: &[T]) -> usize {
  let mut best = 0;
  for (i, v) in values.iter().enumerate().skip(1) {
    if *v > values[best] {
      best = i;
    }
  }
  best
}

//! Error types for the vigil-model inference adapter.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("cannot read model artifact {path:?}: {source}")]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("malformed model artifact: {0}")]
  Json(#[from] serde_json::Error),

  #[error("invalid model artifact: {0}")]
  InvalidArtifact(String),

  #[error("feature {name} is not a finite number: {value}")]
  NonFiniteFeature { name: &'static str, value: f64 },

  #[error("model produced a non-finite score")]
  NonFiniteScore,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

//! The `Classifier` trait — the seam between ingestion and the risk model.

use crate::student::Features;

/// A frozen risk model mapping four features to a categorical label.
///
/// Implementations must be deterministic for a fixed loaded model and are
/// shared read-only across requests.
pub trait Classifier: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Predict the risk label (e.g. `"Low"`, `"Medium"`, `"High"`) for
  /// `features`.
  fn classify(&self, features: &Features) -> Result<String, Self::Error>;
}

impl<C: Classifier + ?Sized> Classifier for std::sync::Arc<C> {
  type Error = C::Error;

  fn classify(&self, features: &Features) -> Result<String, Self::Error> {
    (**self).classify(features)
  }
}

//! POST /upload: classify a performance sheet and store the results.

use axum::{
  extract::{Multipart, State},
  response::Redirect,
};
use bytes::Bytes;
use vigil_core::store::StudentStore;

use crate::{AppState, error::Error, session::Teacher};

/// Name of the multipart field carrying the CSV file.
pub const CSV_FIELD: &str = "csv_file";

pub async fn handler<S>(
  Teacher(user): Teacher,
  State(state): State<AppState<S>>,
  mut multipart: Multipart,
) -> Result<Redirect, Error>
where
  S: StudentStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let mut csv: Option<Bytes> = None;
  while let Some(field) = multipart.next_field().await? {
    if field.name() == Some(CSV_FIELD) {
      csv = Some(field.bytes().await?);
    }
  }
  let csv = csv.ok_or_else(|| Error::BadRequest(format!("missing `{CSV_FIELD}` field")))?;

  let report = vigil_ingest::ingest(state.store.as_ref(), state.model.as_ref(), &csv)
    .await
    .inspect_err(|e| {
      tracing::warn!(user = %user.username, row = ?e.row(), error = %e, "upload rejected");
    })?;

  tracing::info!(
    user = %user.username,
    rows = report.rows,
    risks = ?report.risk_counts,
    "upload accepted"
  );
  Ok(Redirect::to(&format!("/teacher?uploaded={}", report.rows)))
}

//! Error types and axum `IntoResponse` implementation.

use axum::{
  Json,
  extract::multipart::MultipartError,
  http::StatusCode,
  response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use thiserror::Error;
use vigil_ingest::IngestError;

#[derive(Debug, Error)]
pub enum Error {
  /// No valid session, or the session's role does not match the route.
  #[error("unauthorized")]
  Unauthorized,
  /// Wrong username or password at login.
  #[error("invalid username or password")]
  InvalidCredentials,
  #[error("conflict: {0}")]
  Conflict(String),
  #[error("bad request: {0}")]
  BadRequest(String),
  #[error("multipart error: {0}")]
  Multipart(#[from] MultipartError),
  #[error(transparent)]
  Ingest(#[from] IngestError),
  #[error("password hashing failed: {0}")]
  Hash(String),
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

fn json_error(status: StatusCode, message: String) -> Response {
  (status, Json(json!({ "error": message }))).into_response()
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::Unauthorized => Redirect::to("/login").into_response(),
      Error::InvalidCredentials => {
        Redirect::to("/login?error=invalid").into_response()
      }
      Error::Conflict(msg) => json_error(StatusCode::CONFLICT, msg),
      Error::BadRequest(msg) => json_error(StatusCode::BAD_REQUEST, msg),
      Error::Multipart(e) => json_error(e.status(), e.body_text()),
      Error::Ingest(e) => {
        let status = match e {
          IngestError::Parse(_) | IngestError::Inference { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
          }
          IngestError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({ "error": e.to_string(), "row": e.row() });
        (status, Json(body)).into_response()
      }
      Error::Hash(msg) => {
        tracing::error!(error = %msg, "password hashing failed");
        json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal error".into())
      }
      Error::Store(e) => {
        tracing::error!(error = %e, "store error");
        json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal error".into())
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use axum::http::header;
  use vigil_ingest::ParseError;

  use super::*;

  #[test]
  fn unauthorized_redirects_to_login() {
    let res = Error::Unauthorized.into_response();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(res.headers()[header::LOCATION], "/login");
  }

  #[test]
  fn parse_errors_are_unprocessable() {
    let err = Error::from(IngestError::Parse(ParseError::EmptyStudentId { row: 3 }));
    assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
  }

  #[test]
  fn storage_errors_are_internal() {
    let err = Error::from(IngestError::Storage("disk full".into()));
    assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
  }

  #[tokio::test]
  async fn store_errors_hide_database_detail() {
    let err = Error::Store("no such table: students".into());
    let res = err.into_response();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "internal error");
  }
}

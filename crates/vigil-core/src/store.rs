//! The `StudentStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `vigil-store-sqlite`).
//! Higher layers (`vigil-ingest`, `vigil-web`) depend on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  student::{CohortSummary, StudentRecord},
  user::{Credentials, NewUser, Session, User},
};

/// Abstraction over a Vigil storage backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait StudentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Persist a new account. Returns `None` if the username is taken.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Look up an account and its password hash by username.
  fn find_credentials<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<Credentials>, Self::Error>> + Send + 'a;

  // ── Sessions ──────────────────────────────────────────────────────────

  fn create_session(
    &self,
    session: Session,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Resolve a token digest to its owner, re-reading the user row so that
  /// role and student_id are always current. Expired sessions resolve to
  /// `None`.
  fn resolve_session<'a>(
    &'a self,
    token_hash: &'a str,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  fn delete_session<'a>(
    &'a self,
    token_hash: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Delete every session that expired at or before `now`; returns how many.
  fn purge_expired_sessions(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Student records ───────────────────────────────────────────────────

  /// Insert or fully replace each record, keyed by `student_id`, in order.
  ///
  /// The whole batch is atomic: on error nothing is written.
  fn upsert_students(
    &self,
    records: Vec<StudentRecord>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  fn get_student<'a>(
    &'a self,
    student_id: &'a str,
  ) -> impl Future<Output = Result<Option<StudentRecord>, Self::Error>> + Send + 'a;

  /// All records ordered by `student_id`.
  fn list_students(
    &self,
  ) -> impl Future<Output = Result<Vec<StudentRecord>, Self::Error>> + Send + '_;

  /// Compute the cohort means and risk distribution over all records.
  fn summarize(
    &self,
  ) -> impl Future<Output = Result<CohortSummary, Self::Error>> + Send + '_;
}

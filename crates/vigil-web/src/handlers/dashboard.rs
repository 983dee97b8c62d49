//! Teacher and student dashboards.

use axum::{
  Json,
  extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use vigil_core::{
  student::{CohortSummary, FEATURE_NAMES, StudentRecord},
  store::StudentStore,
};

use crate::{
  AppState,
  error::Error,
  session::{Student, Teacher},
};

#[derive(Debug, Deserialize)]
pub struct TeacherQuery {
  /// Row count of the upload that redirected here, if any.
  pub uploaded: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct TeacherView {
  pub username:     String,
  pub uploaded:     Option<usize>,
  pub summary:      CohortSummary,
  pub chart_labels: [&'static str; 4],
  pub chart_data:   [f64; 4],
}

pub async fn teacher<S>(
  Teacher(user): Teacher,
  State(state): State<AppState<S>>,
  Query(query): Query<TeacherQuery>,
) -> Result<Json<TeacherView>, Error>
where
  S: StudentStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let summary = state.store.summarize().await.map_err(Error::store)?;
  Ok(Json(TeacherView {
    username: user.username,
    uploaded: query.uploaded,
    chart_labels: FEATURE_NAMES,
    chart_data: summary.averages.chart_data(),
    summary,
  }))
}

pub async fn students<S>(
  Teacher(_): Teacher,
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<StudentRecord>>, Error>
where
  S: StudentStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let records = state.store.list_students().await.map_err(Error::store)?;
  Ok(Json(records))
}

/// What a student sees: their record, or an explicit empty state when no
/// upload has covered their id yet.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StudentView {
  Ok {
    username: String,
    student:  StudentRecord,
  },
  NoData {
    username:   String,
    student_id: Option<String>,
  },
}

pub async fn student<S>(
  Student(user): Student,
  State(state): State<AppState<S>>,
) -> Result<Json<StudentView>, Error>
where
  S: StudentStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let record = match user.student_id.as_deref() {
    Some(id) => state.store.get_student(id).await.map_err(Error::store)?,
    None => None,
  };

  let view = match record {
    Some(student) => StudentView::Ok { username: user.username, student },
    None => StudentView::NoData {
      username:   user.username,
      student_id: user.student_id,
    },
  };
  Ok(Json(view))
}

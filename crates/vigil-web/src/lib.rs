//! HTTP layer for Vigil.
//!
//! Exposes an axum [`Router`] serving signup/login, the teacher and student
//! dashboards, and the CSV upload endpoint, backed by any [`StudentStore`]
//! and a loaded [`ModelBundle`].

pub mod auth;
pub mod error;
pub mod handlers;
pub mod session;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use vigil_core::store::StudentStore;
use vigil_model::ModelBundle;

use handlers::{account, dashboard, upload};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `VIGIL_*` environment variables. Every key is optional.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                String,
  pub port:                u16,
  pub store_path:          PathBuf,
  pub model_path:          PathBuf,
  pub session_ttl_minutes: u32,
  pub max_upload_bytes:    usize,
  pub secure_cookies:      bool,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                "127.0.0.1".into(),
      port:                5000,
      store_path:          PathBuf::from("vigil.db"),
      model_path:          PathBuf::from("ml/model.json"),
      session_ttl_minutes: 480,
      max_upload_bytes:    8 * 1024 * 1024,
      secure_cookies:      false,
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: StudentStore> {
  pub store:  Arc<S>,
  pub model:  Arc<ModelBundle>,
  pub config: Arc<ServerConfig>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the dashboard server.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: StudentStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let body_limit = state.config.max_upload_bytes;

  Router::new()
    .route("/",                 get(account::index))
    .route("/signup",           get(account::signup_form).post(account::signup::<S>))
    .route("/login",            get(account::login_form).post(account::login::<S>))
    .route("/logout",           get(account::logout::<S>))
    .route("/teacher",          get(dashboard::teacher::<S>))
    .route("/teacher/students", get(dashboard::students::<S>))
    .route("/student",          get(dashboard::student::<S>))
    .route("/upload",           post(upload::handler::<S>))
    .layer(DefaultBodyLimit::max(body_limit))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
  };
  use chrono::{Duration, Utc};
  use serde_json::Value;
  use tower::ServiceExt as _;
  use vigil_core::{
    classify::Classifier,
    student::Features,
    user::{Role, Session},
  };
  use vigil_store_sqlite::SqliteStore;

  use crate::session::hash_token;

  const MODEL: &str = r#"{
    "feature_names": ["attendance", "avg_marks", "assignment_completion", "behavior_score"],
    "model": {
      "kind": "logistic",
      "coefficients": [
        [-0.05, -0.05, -0.02, -0.02],
        [ 0.05,  0.05,  0.02,  0.02],
        [ 0.0,   0.0,   0.0,   0.0 ]
      ],
      "intercepts": [6.5, -6.5, 1.0]
    },
    "label_encoder": { "classes": ["High", "Low", "Medium"] }
  }"#;

  const HEADER: &str =
    "student_id,name,attendance,avg_marks,assignment_completion,behavior_score\n";

  const BOUNDARY: &str = "vigil-test-boundary";

  async fn make_state() -> AppState<SqliteStore> {
    make_state_with(ServerConfig::default()).await
  }

  async fn make_state_with(config: ServerConfig) -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    AppState {
      store:  Arc::new(store),
      model:  Arc::new(ModelBundle::from_json(MODEL).unwrap()),
      config: Arc::new(config),
    }
  }

  async fn send(state: &AppState<SqliteStore>, req: Request<Body>) -> Response {
    router(state.clone()).oneshot(req).await.unwrap()
  }

  async fn get_page(
    state: &AppState<SqliteStore>,
    uri: &str,
    cookie: Option<&str>,
  ) -> Response {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(c) = cookie {
      builder = builder.header(header::COOKIE, c);
    }
    send(state, builder.body(Body::empty()).unwrap()).await
  }

  async fn post_form(state: &AppState<SqliteStore>, uri: &str, body: &str) -> Response {
    let req = Request::builder()
      .method("POST")
      .uri(uri)
      .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
      .body(Body::from(body.to_string()))
      .unwrap();
    send(state, req).await
  }

  async fn upload(state: &AppState<SqliteStore>, cookie: &str, csv: &str) -> Response {
    let body = format!(
      "--{BOUNDARY}\r\n\
       Content-Disposition: form-data; name=\"csv_file\"; filename=\"sheet.csv\"\r\n\
       Content-Type: text/csv\r\n\r\n\
       {csv}\r\n\
       --{BOUNDARY}--\r\n"
    );
    let req = Request::builder()
      .method("POST")
      .uri("/upload")
      .header(header::COOKIE, cookie)
      .header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={BOUNDARY}"),
      )
      .body(Body::from(body))
      .unwrap();
    send(state, req).await
  }

  fn location(resp: &Response) -> &str {
    resp.headers()[header::LOCATION].to_str().unwrap()
  }

  async fn body_json(resp: Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  /// Sign up, log in, and return the `name=value` pair of the session cookie.
  async fn account(
    state: &AppState<SqliteStore>,
    username: &str,
    role: &str,
    student_id: &str,
  ) -> String {
    let resp = post_form(
      state,
      "/signup",
      &format!("username={username}&password=pw&role={role}&student_id={student_id}"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");

    let resp = post_form(state, "/login", &format!("username={username}&password=pw")).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    resp.headers()[header::SET_COOKIE]
      .to_str()
      .unwrap()
      .split(';')
      .next()
      .unwrap()
      .to_string()
  }

  fn token(cookie: &str) -> &str { cookie.split_once('=').unwrap().1 }

  fn csv(body: &str) -> String { format!("{HEADER}{body}") }

  fn features(a: f64, m: f64, c: f64, b: f64) -> Features {
    Features {
      attendance:            a,
      avg_marks:             m,
      assignment_completion: c,
      behavior_score:        b,
    }
  }

  // ── Accounts and sessions ───────────────────────────────────────────────────

  #[tokio::test]
  async fn signup_then_login_carries_role_and_student_id() {
    let state = make_state().await;
    let cookie = account(&state, "ada", "student", "S1").await;
    assert!(cookie.starts_with("vigil_session="));

    let user = state
      .store
      .resolve_session(&hash_token(token(&cookie)), Utc::now())
      .await
      .unwrap()
      .unwrap();
    assert_eq!(user.role, Role::Student);
    assert_eq!(user.student_id.as_deref(), Some("S1"));
  }

  #[tokio::test]
  async fn login_redirects_to_role_home() {
    let state = make_state().await;
    post_form(&state, "/signup", "username=tess&password=pw&role=teacher").await;

    let resp = post_form(&state, "/login", "username=tess&password=pw").await;
    assert_eq!(location(&resp), "/teacher");
    let set_cookie = resp.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
  }

  #[tokio::test]
  async fn bad_credentials_redirect_with_error() {
    let state = make_state().await;
    account(&state, "ada", "student", "S1").await;

    let wrong = post_form(&state, "/login", "username=ada&password=nope").await;
    assert_eq!(wrong.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&wrong), "/login?error=invalid");
    assert!(wrong.headers().get(header::SET_COOKIE).is_none());

    let unknown = post_form(&state, "/login", "username=ghost&password=pw").await;
    assert_eq!(location(&unknown), "/login?error=invalid");
  }

  #[tokio::test]
  async fn signup_validation() {
    let state = make_state().await;
    account(&state, "ada", "student", "S1").await;

    let dup = post_form(&state, "/signup", "username=ada&password=x&role=teacher").await;
    assert_eq!(dup.status(), StatusCode::CONFLICT);

    let blank = post_form(&state, "/signup", "username=+&password=x&role=teacher").await;
    assert_eq!(blank.status(), StatusCode::BAD_REQUEST);

    let role = post_form(&state, "/signup", "username=bo&password=x&role=admin").await;
    assert_eq!(role.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(role).await["error"].as_str().unwrap().contains("admin"));
  }

  #[tokio::test]
  async fn blank_student_id_is_stored_as_none() {
    let state = make_state().await;
    let cookie = account(&state, "cy", "student", "").await;

    let resp = get_page(&state, "/student", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let view = body_json(resp).await;
    assert_eq!(view["status"], "no_data");
    assert!(view["student_id"].is_null());
  }

  #[tokio::test]
  async fn wrong_role_or_no_session_redirects_to_login() {
    let state = make_state().await;
    let student = account(&state, "ada", "student", "S1").await;
    let teacher = account(&state, "tess", "teacher", "").await;

    for (uri, cookie) in [
      ("/teacher", Some(student.as_str())),
      ("/teacher/students", Some(student.as_str())),
      ("/student", Some(teacher.as_str())),
      ("/teacher", None),
      ("/student", Some("vigil_session=forged")),
    ] {
      let resp = get_page(&state, uri, cookie).await;
      assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{uri}");
      assert_eq!(location(&resp), "/login", "{uri}");
    }

    let resp = upload(&state, &student, &csv("S1,A,90,85,100,80\n")).await;
    assert_eq!(location(&resp), "/login");
    assert!(state.store.list_students().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn logout_invalidates_session() {
    let state = make_state().await;
    let cookie = account(&state, "tess", "teacher", "").await;
    assert_eq!(get_page(&state, "/teacher", Some(&cookie)).await.status(), StatusCode::OK);

    let resp = get_page(&state, "/logout", Some(&cookie)).await;
    assert_eq!(location(&resp), "/login");

    let resp = get_page(&state, "/teacher", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");
  }

  #[tokio::test]
  async fn expired_session_is_rejected() {
    let state = make_state().await;
    let cookie = account(&state, "tess", "teacher", "").await;
    let user = state
      .store
      .resolve_session(&hash_token(token(&cookie)), Utc::now())
      .await
      .unwrap()
      .unwrap();

    let now = Utc::now();
    state
      .store
      .create_session(Session {
        token_hash: hash_token("stale"),
        user_id:    user.id,
        created_at: now - Duration::hours(9),
        expires_at: now - Duration::hours(1),
      })
      .await
      .unwrap();

    let resp = get_page(&state, "/teacher", Some("vigil_session=stale")).await;
    assert_eq!(location(&resp), "/login");
  }

  // ── Upload and dashboards ───────────────────────────────────────────────────

  #[tokio::test]
  async fn upload_classifies_and_stores_row() {
    let state = make_state().await;
    let teacher = account(&state, "tess", "teacher", "").await;

    let resp = upload(&state, &teacher, &csv("S1,A,90,85,100,80\n")).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/teacher?uploaded=1");

    let expected = state.model.classify(&features(90.0, 85.0, 100.0, 80.0)).unwrap();
    let all = state.store.list_students().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].student_id, "S1");
    assert_eq!(all[0].risk, expected);

    let student = account(&state, "ada", "student", "S1").await;
    let view = body_json(get_page(&state, "/student", Some(&student)).await).await;
    assert_eq!(view["status"], "ok");
    assert_eq!(view["student"]["student_id"], "S1");
    assert_eq!(view["student"]["risk"], expected.as_str());
    assert_eq!(view["student"]["attendance"], 90.0);
  }

  #[tokio::test]
  async fn reupload_replaces_prior_record() {
    let state = make_state().await;
    let teacher = account(&state, "tess", "teacher", "").await;

    upload(&state, &teacher, &csv("S1,A,90,85,100,80\n")).await;
    let resp = upload(&state, &teacher, &csv("S1,Alice,20,15,10,20\n")).await;
    assert_eq!(location(&resp), "/teacher?uploaded=1");

    let resp = get_page(&state, "/teacher/students", Some(&teacher)).await;
    let list = body_json(resp).await;
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["name"], "Alice");
    assert_eq!(list[0]["avg_marks"], 15.0);
    let expected = state.model.classify(&features(20.0, 15.0, 10.0, 20.0)).unwrap();
    assert_eq!(list[0]["risk"], expected.as_str());
  }

  #[tokio::test]
  async fn student_without_record_sees_no_data() {
    let state = make_state().await;
    let student = account(&state, "ada", "student", "S404").await;

    let resp = get_page(&state, "/student", Some(&student)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let view = body_json(resp).await;
    assert_eq!(view["status"], "no_data");
    assert_eq!(view["student_id"], "S404");
  }

  #[tokio::test]
  async fn teacher_dashboard_reports_means() {
    let state = make_state().await;
    let teacher = account(&state, "tess", "teacher", "").await;

    let empty = body_json(get_page(&state, "/teacher", Some(&teacher)).await).await;
    assert_eq!(empty["summary"]["student_count"], 0);
    assert_eq!(empty["chart_data"], serde_json::json!([0.0, 0.0, 0.0, 0.0]));
    assert!(empty["uploaded"].is_null());

    upload(
      &state,
      &teacher,
      &csv("S1,A,90,80,100,70\nS2,B,70,60,50,90\nS3,C,50,40,0,50\n"),
    )
    .await;

    let resp = get_page(&state, "/teacher?uploaded=3", Some(&teacher)).await;
    let view = body_json(resp).await;
    assert_eq!(view["uploaded"], 3);
    assert_eq!(view["summary"]["student_count"], 3);
    assert_eq!(view["chart_data"], serde_json::json!([70.0, 60.0, 50.0, 70.0]));
    assert_eq!(view["chart_labels"][0], "attendance");
  }

  #[tokio::test]
  async fn missing_column_is_rejected_without_writes() {
    let state = make_state().await;
    let teacher = account(&state, "tess", "teacher", "").await;
    upload(&state, &teacher, &csv("S1,A,90,85,100,80\n")).await;
    let before = state.store.list_students().await.unwrap();

    let resp = upload(&state, &teacher, "student_id,name,attendance\nS2,B,50\n").await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("avg_marks"));

    assert_eq!(state.store.list_students().await.unwrap(), before);
  }

  #[tokio::test]
  async fn bad_value_names_the_row_and_writes_nothing() {
    let state = make_state().await;
    let teacher = account(&state, "tess", "teacher", "").await;

    let resp = upload(&state, &teacher, &csv("S1,A,90,85,100,80\nS2,B,abc,85,100,80\n")).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(resp).await;
    assert_eq!(body["row"], 2);
    assert!(body["error"].as_str().unwrap().starts_with("row 2"));

    assert!(state.store.list_students().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn oversized_upload_is_payload_too_large() {
    let state = make_state_with(ServerConfig {
      max_upload_bytes: 256,
      ..ServerConfig::default()
    })
    .await;
    let teacher = account(&state, "tess", "teacher", "").await;

    let rows: String = (0..50).map(|i| format!("S{i},N,90,85,100,80\n")).collect();
    let resp = upload(&state, &teacher, &csv(&rows)).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(state.store.list_students().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn upload_without_csv_field_is_bad_request() {
    let state = make_state().await;
    let teacher = account(&state, "tess", "teacher", "").await;

    let body = format!(
      "--{BOUNDARY}\r\n\
       Content-Disposition: form-data; name=\"other\"\r\n\r\n\
       x\r\n\
       --{BOUNDARY}--\r\n"
    );
    let req = Request::builder()
      .method("POST")
      .uri("/upload")
      .header(header::COOKIE, &teacher)
      .header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={BOUNDARY}"),
      )
      .body(Body::from(body))
      .unwrap();
    let resp = send(&state, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn public_views_render() {
    let state = make_state().await;

    let index = body_json(get_page(&state, "/", None).await).await;
    assert_eq!(index["roles"], serde_json::json!(["teacher", "student"]));

    let login = body_json(get_page(&state, "/login?error=invalid", None).await).await;
    assert_eq!(login["error"], "invalid username or password");

    let signup = get_page(&state, "/signup", None).await;
    assert_eq!(signup.status(), StatusCode::OK);
  }
}

//! Landing page, signup, login and logout.

use axum::{
  Form, Json,
  extract::{Query, State},
  response::Redirect,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use vigil_core::{
  store::StudentStore,
  user::{NewUser, Role, Session},
};

use crate::{
  AppState, auth,
  error::Error,
  session::{clear_cookie, hash_token, new_token, session_cookie, token_from},
};

const ROLES: [&str; 2] = ["teacher", "student"];

pub async fn index() -> Json<Value> {
  Json(json!({
    "view":  "role_select",
    "roles": ROLES,
    "links": { "signup": "/signup", "login": "/login" },
  }))
}

pub async fn signup_form() -> Json<Value> {
  Json(json!({
    "view":   "signup",
    "action": "/signup",
    "fields": ["username", "password", "role", "student_id"],
    "roles":  ROLES,
  }))
}

#[derive(Debug, Deserialize)]
pub struct SignupForm {
  pub username:   String,
  pub password:   String,
  pub role:       String,
  #[serde(default)]
  pub student_id: Option<String>,
}

pub async fn signup<S>(
  State(state): State<AppState<S>>,
  Form(form): Form<SignupForm>,
) -> Result<Redirect, Error>
where
  S: StudentStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let username = form.username.trim();
  if username.is_empty() {
    return Err(Error::BadRequest("username is required".into()));
  }
  if form.password.is_empty() {
    return Err(Error::BadRequest("password is required".into()));
  }
  let role: Role = form
    .role
    .parse()
    .map_err(|e: vigil_core::Error| Error::BadRequest(e.to_string()))?;
  let student_id = form
    .student_id
    .map(|s| s.trim().to_owned())
    .filter(|s| !s.is_empty());

  let input = NewUser {
    username: username.to_owned(),
    password_hash: auth::hash_password_blocking(form.password).await?,
    role,
    student_id,
  };

  let user = state
    .store
    .create_user(input)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::Conflict(format!("username already taken: {username}")))?;

  tracing::info!(user = %user.username, role = %user.role, "account created");
  Ok(Redirect::to("/login"))
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
  pub error: Option<String>,
}

pub async fn login_form(Query(query): Query<LoginQuery>) -> Json<Value> {
  Json(json!({
    "view":   "login",
    "action": "/login",
    "fields": ["username", "password"],
    "error":  query.error.map(|_| "invalid username or password"),
  }))
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
  pub username: String,
  pub password: String,
}

pub async fn login<S>(
  State(state): State<AppState<S>>,
  jar: CookieJar,
  Form(form): Form<LoginForm>,
) -> Result<(CookieJar, Redirect), Error>
where
  S: StudentStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let credentials = state
    .store
    .find_credentials(form.username.trim())
    .await
    .map_err(Error::store)?;

  let stored = credentials.as_ref().map(|c| c.password_hash.clone());
  let verified = auth::verify_password_blocking(form.password, stored).await?;
  let Some(credentials) = credentials.filter(|_| verified) else {
    tracing::warn!("login rejected");
    return Err(Error::InvalidCredentials);
  };
  let user = &credentials.user;

  let now = Utc::now();
  let purged = state
    .store
    .purge_expired_sessions(now)
    .await
    .map_err(Error::store)?;
  if purged > 0 {
    tracing::debug!(purged, "expired sessions removed");
  }

  let ttl = Duration::minutes(i64::from(state.config.session_ttl_minutes));
  let token = new_token();
  state
    .store
    .create_session(Session {
      token_hash: hash_token(&token),
      user_id:    user.id,
      created_at: now,
      expires_at: now + ttl,
    })
    .await
    .map_err(Error::store)?;

  tracing::info!(user = %user.username, role = %user.role, "login");
  let jar = jar.add(session_cookie(token, ttl, state.config.secure_cookies));
  Ok((jar, Redirect::to(user.role.home_path())))
}

pub async fn logout<S>(
  State(state): State<AppState<S>>,
  jar: CookieJar,
) -> Result<(CookieJar, Redirect), Error>
where
  S: StudentStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  if let Some(token) = token_from(&jar) {
    state
      .store
      .delete_session(&hash_token(&token))
      .await
      .map_err(Error::store)?;
  }
  Ok((jar.remove(clear_cookie()), Redirect::to("/login")))
}

//! Cookie sessions and the role gate.
//!
//! The browser holds an opaque random token; the store keeps only its SHA-256
//! digest. Every privileged request resolves the token against the store, so
//! the role and student id seen by a handler are always the current ones.
//!
//! Handlers opt in by taking one of the extractors below. A missing, expired
//! or wrong-role session rejects with [`Error::Unauthorized`], which redirects
//! to `/login`.

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use rand_core::{OsRng, RngCore as _};
use sha2::{Digest as _, Sha256};
use vigil_core::{
  store::StudentStore,
  user::{Role, User},
};

use crate::{AppState, error::Error};

pub const SESSION_COOKIE: &str = "vigil_session";

const TOKEN_BYTES: usize = 32;

/// A fresh 256-bit token, hex-encoded for the cookie.
pub fn new_token() -> String {
  let mut bytes = [0u8; TOKEN_BYTES];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}

/// The digest stored in place of the raw token.
pub fn hash_token(token: &str) -> String {
  hex::encode(Sha256::digest(token.as_bytes()))
}

pub fn session_cookie(token: String, ttl: chrono::Duration, secure: bool) -> Cookie<'static> {
  Cookie::build(Cookie::new(SESSION_COOKIE, token))
    .path("/")
    .http_only(true)
    .same_site(SameSite::Lax)
    .secure(secure)
    .max_age(time::Duration::seconds(ttl.num_seconds()))
    .build()
}

pub fn clear_cookie() -> Cookie<'static> {
  Cookie::build(Cookie::new(SESSION_COOKIE, ""))
    .path("/")
    .http_only(true)
    .same_site(SameSite::Lax)
    .build()
}

/// The raw session token carried by a request, if any.
pub fn token_from(jar: &CookieJar) -> Option<String> {
  jar
    .get(SESSION_COOKIE)
    .map(|c| c.value().to_owned())
    .filter(|t| !t.is_empty())
}

// ─── Extractors ──────────────────────────────────────────────────────────────

/// Any logged-in user.
pub struct CurrentUser(pub User);

/// A logged-in user with the teacher role.
pub struct Teacher(pub User);

/// A logged-in user with the student role.
pub struct Student(pub User);

impl<S> FromRequestParts<AppState<S>> for CurrentUser
where
  S: StudentStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let jar = CookieJar::from_headers(&parts.headers);
    let token = token_from(&jar).ok_or(Error::Unauthorized)?;

    let user = state
      .store
      .resolve_session(&hash_token(&token), Utc::now())
      .await
      .map_err(Error::store)?
      .ok_or(Error::Unauthorized)?;

    Ok(CurrentUser(user))
  }
}

async fn require_role<S>(
  parts: &mut Parts,
  state: &AppState<S>,
  role: Role,
) -> Result<User, Error>
where
  S: StudentStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
  if user.role != role {
    tracing::debug!(user = %user.username, role = %user.role, "role mismatch");
    return Err(Error::Unauthorized);
  }
  Ok(user)
}

impl<S> FromRequestParts<AppState<S>> for Teacher
where
  S: StudentStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    require_role(parts, state, Role::Teacher).await.map(Teacher)
  }
}

impl<S> FromRequestParts<AppState<S>> for Student
where
  S: StudentStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    require_role(parts, state, Role::Student).await.map(Student)
  }
}

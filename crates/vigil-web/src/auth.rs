//! Password hashing and verification.

use std::sync::OnceLock;

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use rand_core::OsRng;

use crate::error::Error;

/// Hash `password` into an argon2 PHC string, e.g. `$argon2id$v=19$…`.
pub fn hash_password(password: &str) -> Result<String, Error> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| Error::Hash(e.to_string()))
}

/// Check `password` against a stored PHC string.
///
/// With no stored hash (unknown username) the password is still checked
/// against a fixed dummy hash, so both failure paths cost one argon2 run.
pub fn verify_password(password: &str, stored: Option<&str>) -> bool {
  let target = stored.unwrap_or_else(|| dummy_hash());
  let matches = PasswordHash::new(target).is_ok_and(|parsed| {
    Argon2::default()
      .verify_password(password.as_bytes(), &parsed)
      .is_ok()
  });
  matches && stored.is_some()
}

/// [`hash_password`] on tokio's blocking pool.
pub async fn hash_password_blocking(password: String) -> Result<String, Error> {
  tokio::task::spawn_blocking(move || hash_password(&password))
    .await
    .map_err(|e| Error::Hash(e.to_string()))?
}

/// [`verify_password`] on tokio's blocking pool.
pub async fn verify_password_blocking(
  password: String,
  stored: Option<String>,
) -> Result<bool, Error> {
  tokio::task::spawn_blocking(move || verify_password(&password, stored.as_deref()))
    .await
    .map_err(|e| Error::Hash(e.to_string()))
}

fn dummy_hash() -> &'static str {
  static DUMMY: OnceLock<String> = OnceLock::new();
  DUMMY.get_or_init(|| hash_password("vigil-dummy-password").unwrap_or_default())
}

//! Accounts and roles.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Which dashboard an account may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Teacher,
  Student,
}

impl Role {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Teacher => "teacher",
      Self::Student => "student",
    }
  }

  /// The dashboard path a freshly logged-in user lands on.
  pub fn home_path(&self) -> &'static str {
    match self {
      Self::Teacher => "/teacher",
      Self::Student => "/student",
    }
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Role {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim() {
      "teacher" => Ok(Self::Teacher),
      "student" => Ok(Self::Student),
      other => Err(Error::UnknownRole(other.to_owned())),
    }
  }
}

/// A registered account. Created on signup; never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id:         i64,
  pub username:   String,
  pub role:       Role,
  /// Unenforced reference to [`crate::student::StudentRecord::student_id`].
  pub student_id: Option<String>,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::StudentStore::create_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
  pub role:          Role,
  pub student_id:    Option<String>,
}

/// A user together with the stored password hash, for login checks only.
#[derive(Debug, Clone)]
pub struct Credentials {
  pub user:          User,
  pub password_hash: String,
}

/// A server-side login session.
///
/// Only the SHA-256 digest of the cookie token is ever stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
  /// Lowercase hex SHA-256 of the opaque cookie token.
  pub token_hash: String,
  pub user_id:    i64,
  pub created_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
}

impl Session {
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool { self.expires_at <= now }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn role_parses_and_displays() {
    assert_eq!("teacher".parse::<Role>().unwrap(), Role::Teacher);
    assert_eq!(" student ".parse::<Role>().unwrap(), Role::Student);
    assert_eq!(Role::Teacher.to_string(), "teacher");
  }

  #[test]
  fn unknown_role_is_rejected() {
    let err = "admin".parse::<Role>().unwrap_err();
    assert!(matches!(err, Error::UnknownRole(ref r) if r == "admin"));
  }

  #[test]
  fn home_path_matches_role() {
    assert_eq!(Role::Teacher.home_path(), "/teacher");
    assert_eq!(Role::Student.home_path(), "/student");
  }
}

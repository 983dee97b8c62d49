//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 UTC strings with a fixed microsecond
//! precision and a `Z` suffix, so lexical order matches time order.

use chrono::{DateTime, SecondsFormat, Utc};
use vigil_core::{
  student::{Features, StudentRecord},
  user::{Credentials, Role, User},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Role ────────────────────────────────────────────────────────────────────

pub fn encode_role(role: Role) -> &'static str { role.as_str() }

pub fn decode_role(s: &str) -> Result<Role> { Ok(s.parse()?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub id:            i64,
  pub username:      String,
  pub password_hash: String,
  pub role:          String,
  pub student_id:    Option<String>,
  pub created_at:    String,
}

impl RawUser {
  /// Column list matching [`RawUser::from_row`].
  pub const COLUMNS: &'static str =
    "u.id, u.username, u.password_hash, u.role, u.student_id, u.created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      username:      row.get(1)?,
      password_hash: row.get(2)?,
      role:          row.get(3)?,
      student_id:    row.get(4)?,
      created_at:    row.get(5)?,
    })
  }

  pub fn into_credentials(self) -> Result<Credentials> {
    let user = User {
      id:         self.id,
      username:   self.username,
      role:       decode_role(&self.role)?,
      student_id: self.student_id,
      created_at: decode_dt(&self.created_at)?,
    };
    Ok(Credentials { user, password_hash: self.password_hash })
  }

  pub fn into_user(self) -> Result<User> { Ok(self.into_credentials()?.user) }
}

/// Column list matching [`student_from_row`].
pub const STUDENT_COLUMNS: &str = "student_id, name, attendance, avg_marks, \
                                   assignment_completion, behavior_score, risk";

pub fn student_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StudentRecord> {
  Ok(StudentRecord {
    student_id: row.get(0)?,
    name:       row.get(1)?,
    features:   Features {
      attendance:            row.get(2)?,
      avg_marks:             row.get(3)?,
      assignment_completion: row.get(4)?,
      behavior_score:        row.get(5)?,
    },
    risk:       row.get(6)?,
  })
}

//! [`SqliteStore`] — the SQLite implementation of [`StudentStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use vigil_core::{
  store::StudentStore,
  student::{Averages, CohortSummary, StudentRecord},
  user::{Credentials, NewUser, Session, User},
};

use crate::{
  Error, Result,
  encode::{
    RawUser, STUDENT_COLUMNS, decode_dt, encode_dt, encode_role, student_from_row,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Vigil store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. All
/// statements run on one background thread, so they are serialised.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

fn to_usize(n: i64, column: &'static str) -> Result<usize> {
  usize::try_from(n).map_err(|_| Error::OutOfRange(column))
}

// ─── StudentStore impl ───────────────────────────────────────────────────────

impl StudentStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<Option<User>> {
    let at_str     = encode_dt(Utc::now());
    let created_at = decode_dt(&at_str)?;
    let username   = input.username.clone();
    let role_str   = encode_role(input.role);
    let hash       = input.password_hash;
    let student_id = input.student_id.clone();

    let id: Option<i64> = self
      .conn
      .call(move |conn| {
        let res = conn.execute(
          "INSERT INTO users (username, password_hash, role, student_id, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![username, hash, role_str, student_id, at_str],
        );
        match res {
          Ok(_) => Ok(Some(conn.last_insert_rowid())),
          Err(rusqlite::Error::SqliteFailure(e, _))
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
          {
            Ok(None)
          }
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    Ok(id.map(|id| User {
      id,
      username: input.username,
      role: input.role,
      student_id: input.student_id,
      created_at,
    }))
  }

  async fn find_credentials(&self, username: &str) -> Result<Option<Credentials>> {
    let username = username.to_owned();

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {} FROM users u WHERE u.username = ?1", RawUser::COLUMNS);
        Ok(
          conn
            .query_row(&sql, rusqlite::params![username], RawUser::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_credentials).transpose()
  }

  // ── Sessions ──────────────────────────────────────────────────────────────

  async fn create_session(&self, session: Session) -> Result<()> {
    let created_str = encode_dt(session.created_at);
    let expires_str = encode_dt(session.expires_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (token_hash, user_id, created_at, expires_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![session.token_hash, session.user_id, created_str, expires_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn resolve_session(
    &self,
    token_hash: &str,
    now:        DateTime<Utc>,
  ) -> Result<Option<User>> {
    let lookup = token_hash.to_owned();

    let row: Option<(String, String, RawUser)> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT s.created_at, s.expires_at, {}
           FROM sessions s
           JOIN users u ON u.id = s.user_id
           WHERE s.token_hash = ?1",
          RawUser::COLUMNS
        );
        Ok(
          conn
            .query_row(&sql, rusqlite::params![lookup], |row| {
              let created: String = row.get(0)?;
              let expires: String = row.get(1)?;
              let user = RawUser {
                id:            row.get(2)?,
                username:      row.get(3)?,
                password_hash: row.get(4)?,
                role:          row.get(5)?,
                student_id:    row.get(6)?,
                created_at:    row.get(7)?,
              };
              Ok((created, expires, user))
            })
            .optional()?,
        )
      })
      .await?;

    let Some((created, expires, raw)) = row else {
      return Ok(None);
    };

    let user = raw.into_user()?;
    let session = Session {
      token_hash: token_hash.to_owned(),
      user_id:    user.id,
      created_at: decode_dt(&created)?,
      expires_at: decode_dt(&expires)?,
    };

    if session.is_expired(now) {
      return Ok(None);
    }
    Ok(Some(user))
  }

  async fn delete_session(&self, token_hash: &str) -> Result<()> {
    let token_hash = token_hash.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM sessions WHERE token_hash = ?1",
          rusqlite::params![token_hash],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
    let now_str = encode_dt(now);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM sessions WHERE expires_at <= ?1",
          rusqlite::params![now_str],
        )?)
      })
      .await?;
    Ok(deleted)
  }

  // ── Student records ───────────────────────────────────────────────────────

  async fn upsert_students(&self, records: Vec<StudentRecord>) -> Result<usize> {
    let written = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare_cached(
            "INSERT INTO students (
               student_id, name, attendance, avg_marks,
               assignment_completion, behavior_score, risk
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(student_id) DO UPDATE SET
               name                  = excluded.name,
               attendance            = excluded.attendance,
               avg_marks             = excluded.avg_marks,
               assignment_completion = excluded.assignment_completion,
               behavior_score        = excluded.behavior_score,
               risk                  = excluded.risk",
          )?;
          for r in &records {
            stmt.execute(rusqlite::params![
              r.student_id,
              r.name,
              r.features.attendance,
              r.features.avg_marks,
              r.features.assignment_completion,
              r.features.behavior_score,
              r.risk,
            ])?;
          }
        }
        // Dropping `tx` without commit rolls back every row above.
        tx.commit()?;
        Ok(records.len())
      })
      .await?;
    Ok(written)
  }

  async fn get_student(&self, student_id: &str) -> Result<Option<StudentRecord>> {
    let student_id = student_id.to_owned();
    let record = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {STUDENT_COLUMNS} FROM students WHERE student_id = ?1");
        Ok(
          conn
            .query_row(&sql, rusqlite::params![student_id], student_from_row)
            .optional()?,
        )
      })
      .await?;
    Ok(record)
  }

  async fn list_students(&self) -> Result<Vec<StudentRecord>> {
    let records = self
      .conn
      .call(|conn| {
        let sql = format!("SELECT {STUDENT_COLUMNS} FROM students ORDER BY student_id");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], student_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(records)
  }

  async fn summarize(&self) -> Result<CohortSummary> {
    let (count, averages, risks): (i64, Averages, Vec<(String, i64)>) = self
      .conn
      .call(|conn| {
        // AVG over zero rows is NULL; the dashboard reports 0 instead.
        let (count, averages) = conn.query_row(
          "SELECT COUNT(*),
                  COALESCE(AVG(attendance), 0.0),
                  COALESCE(AVG(avg_marks), 0.0),
                  COALESCE(AVG(assignment_completion), 0.0),
                  COALESCE(AVG(behavior_score), 0.0)
           FROM students",
          [],
          |row| {
            Ok((row.get::<_, i64>(0)?, Averages {
              attendance:            row.get(1)?,
              avg_marks:             row.get(2)?,
              assignment_completion: row.get(3)?,
              behavior_score:        row.get(4)?,
            }))
          },
        )?;

        let mut stmt = conn.prepare(
          "SELECT risk, COUNT(*) FROM students GROUP BY risk ORDER BY risk",
        )?;
        let risks: Vec<(String, i64)> = stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((count, averages, risks))
      })
      .await?;

    let risk_counts = risks
      .into_iter()
      .map(|(risk, n)| Ok((risk, to_usize(n, "risk count")?)))
      .collect::<Result<_>>()?;

    Ok(CohortSummary {
      student_count: to_usize(count, "student count")?,
      averages,
      risk_counts,
    })
  }
}

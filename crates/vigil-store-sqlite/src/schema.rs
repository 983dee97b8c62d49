//! SQL schema for the Vigil SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Accounts are created on signup and never updated or deleted.
CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    username      TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,   -- argon2 PHC string
    role          TEXT NOT NULL CHECK (role IN ('teacher', 'student')),
    student_id    TEXT,            -- unenforced reference to students
    created_at    TEXT NOT NULL
);

-- One row per student; replaced whole on every upload.
CREATE TABLE IF NOT EXISTS students (
    student_id            TEXT PRIMARY KEY,
    name                  TEXT NOT NULL,
    attendance            REAL NOT NULL,
    avg_marks             REAL NOT NULL,
    assignment_completion REAL NOT NULL,
    behavior_score        REAL NOT NULL,
    risk                  TEXT NOT NULL  -- classifier output, never user-supplied
);

CREATE TABLE IF NOT EXISTS sessions (
    token_hash TEXT PRIMARY KEY,       -- hex SHA-256 of the cookie token
    user_id    INTEGER NOT NULL REFERENCES users(id),
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS sessions_expiry_idx ON sessions(expires_at);

PRAGMA user_version = 1;
";

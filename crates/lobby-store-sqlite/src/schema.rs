//! SQL schema for the Lobby SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS visitors (
    visitor_id  TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    email       TEXT,
    email_key   TEXT UNIQUE,     -- lower-cased email; NULLs never collide
    phone       TEXT,
    company     TEXT,
    host        TEXT,
    purpose     TEXT,
    id_proof    TEXT,
    photo       TEXT,            -- JSON-encoded PhotoRef or NULL
    created_at  TEXT NOT NULL    -- ISO 8601 UTC; server-assigned
);

-- One row per visit. Status and timestamps change together, guarded by version.
CREATE TABLE IF NOT EXISTS approvals (
    approval_id TEXT PRIMARY KEY,
    visitor_id  TEXT NOT NULL REFERENCES visitors(visitor_id) ON DELETE CASCADE,
    status      TEXT NOT NULL,   -- 'PENDING' | 'CHECKED_IN' | 'CHECKED_OUT'
    in_time     TEXT,
    out_time    TEXT,
    created_at  TEXT NOT NULL,
    version     INTEGER NOT NULL DEFAULT 0,
    CHECK (
         (status = 'PENDING'     AND in_time IS NULL     AND out_time IS NULL)
      OR (status = 'CHECKED_IN'  AND in_time IS NOT NULL AND out_time IS NULL)
      OR (status = 'CHECKED_OUT' AND in_time IS NOT NULL AND out_time IS NOT NULL)
    )
);

CREATE INDEX IF NOT EXISTS approvals_visitor_idx ON approvals(visitor_id);
CREATE INDEX IF NOT EXISTS approvals_status_idx  ON approvals(status);

PRAGMA user_version = 1;
";

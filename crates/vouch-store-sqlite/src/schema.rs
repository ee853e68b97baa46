//! SQL schema for the Vouch SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Local identity directory. Only applicant_id and idv_status are ever
-- written by the workflow.
CREATE TABLE IF NOT EXISTS subjects (
    subject_key  TEXT PRIMARY KEY,
    given_name   TEXT NOT NULL,
    family_name  TEXT NOT NULL,
    email        TEXT NOT NULL,
    applicant_id TEXT,
    idv_status   TEXT,
    updated_at   TEXT NOT NULL
);

-- Short-lived workflow sessions. Terminal rows are purged after the
-- configured retention.
CREATE TABLE IF NOT EXISTS sessions (
    session_id   TEXT PRIMARY KEY,
    subject_key  TEXT NOT NULL,
    applicant_id TEXT,
    check_id     TEXT,
    phase_name   TEXT NOT NULL,   -- PhaseName, for filtering
    phase_json   TEXT NOT NULL,   -- full Phase incl. failure payload
    last_status  TEXT,            -- 'pending' | 'in_progress' | 'complete'
    result       TEXT,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

CREATE INDEX        IF NOT EXISTS subjects_applicant_idx ON subjects(applicant_id);
CREATE INDEX        IF NOT EXISTS sessions_applicant_idx ON sessions(applicant_id);
CREATE UNIQUE INDEX IF NOT EXISTS sessions_check_idx     ON sessions(check_id);
CREATE INDEX        IF NOT EXISTS sessions_updated_idx   ON sessions(phase_name, updated_at);

PRAGMA user_version = 1;
";

//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings so that they sort
//! lexically. Phases are stored twice: the bare name for filtering and the
//! full JSON for round-tripping failure payloads.

use std::str::FromStr as _;

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;
use vouch_core::{
  check::{CheckResult, CheckStatus},
  session::{Phase, WorkflowSession},
  subject::Subject,
};

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_status(s: CheckStatus) -> &'static str {
  match s {
    CheckStatus::Pending => "pending",
    CheckStatus::InProgress => "in_progress",
    CheckStatus::Complete => "complete",
  }
}

pub fn decode_status(s: &str) -> Result<CheckStatus> {
  CheckStatus::from_str(s).map_err(|_| Error::UnknownStatus(s.to_owned()))
}

pub fn encode_phase(p: &Phase) -> Result<String> { Ok(serde_json::to_string(p)?) }

pub fn decode_phase(s: &str) -> Result<Phase> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// A `sessions` row exactly as read from SQLite.
pub struct RawSession {
  pub session_id:   String,
  pub subject_key:  String,
  pub applicant_id: Option<String>,
  pub check_id:     Option<String>,
  pub phase_json:   String,
  pub last_status:  Option<String>,
  pub result:       Option<String>,
  pub created_at:   String,
  pub updated_at:   String,
}

/// Column list matching [`RawSession::from_row`].
pub const SESSION_COLUMNS: &str = "session_id, subject_key, applicant_id, check_id, \
   phase_json, last_status, result, created_at, updated_at";

impl RawSession {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      session_id:   row.get(0)?,
      subject_key:  row.get(1)?,
      applicant_id: row.get(2)?,
      check_id:     row.get(3)?,
      phase_json:   row.get(4)?,
      last_status:  row.get(5)?,
      result:       row.get(6)?,
      created_at:   row.get(7)?,
      updated_at:   row.get(8)?,
    })
  }

  pub fn into_session(self) -> Result<WorkflowSession> {
    Ok(WorkflowSession {
      session_id:   decode_uuid(&self.session_id)?,
      subject_key:  self.subject_key,
      applicant_id: self.applicant_id,
      check_id:     self.check_id,
      phase:        decode_phase(&self.phase_json)?,
      last_status:  self.last_status.as_deref().map(decode_status).transpose()?,
      result:       self.result.map(CheckResult::from),
      created_at:   decode_dt(&self.created_at)?,
      updated_at:   decode_dt(&self.updated_at)?,
    })
  }
}

/// A `subjects` row exactly as read from SQLite.
pub struct RawSubject {
  pub subject_key:  String,
  pub given_name:   String,
  pub family_name:  String,
  pub email:        String,
  pub applicant_id: Option<String>,
  pub idv_status:   Option<String>,
}

pub const SUBJECT_COLUMNS: &str =
  "subject_key, given_name, family_name, email, applicant_id, idv_status";

impl RawSubject {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      subject_key:  row.get(0)?,
      given_name:   row.get(1)?,
      family_name:  row.get(2)?,
      email:        row.get(3)?,
      applicant_id: row.get(4)?,
      idv_status:   row.get(5)?,
    })
  }

  pub fn into_subject(self) -> Subject {
    Subject {
      subject_key:  self.subject_key,
      given_name:   self.given_name,
      family_name:  self.family_name,
      email:        self.email,
      applicant_id: self.applicant_id,
      idv_status:   self.idv_status.map(CheckResult::from),
    }
  }
}

//! [`SqliteStore`] — the SQLite implementation of [`SessionStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;
use vouch_core::{session::WorkflowSession, store::SessionStore};

use crate::{
  Result,
  encode::{
    RawSession, SESSION_COLUMNS, encode_dt, encode_phase, encode_status, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// Session store and local identity directory backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
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

  /// Run a single-row session lookup on `column = value`, newest first.
  async fn session_where(
    &self,
    column: &'static str,
    value:  String,
  ) -> Result<Option<WorkflowSession>> {
    let raw: Option<RawSession> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {SESSION_COLUMNS} FROM sessions WHERE {column} = ?1
           ORDER BY updated_at DESC LIMIT 1"
        );
        Ok(
          conn
            .query_row(&sql, rusqlite::params![value], RawSession::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSession::into_session).transpose()
  }
}

// ─── SessionStore impl ───────────────────────────────────────────────────────

impl SessionStore for SqliteStore {
  type Error = crate::Error;

  async fn save<'a>(&'a self, session: &'a WorkflowSession) -> Result<()> {
    let session_id   = encode_uuid(session.session_id);
    let subject_key  = session.subject_key.clone();
    let applicant_id = session.applicant_id.clone();
    let check_id     = session.check_id.clone();
    let phase_name   = session.phase.name().as_ref().to_owned();
    let phase_json   = encode_phase(&session.phase)?;
    let last_status  = session.last_status.map(encode_status);
    let result       = session.result.as_ref().map(|r| r.as_str().to_owned());
    let created_at   = encode_dt(session.created_at);
    let updated_at   = encode_dt(session.updated_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (
             session_id, subject_key, applicant_id, check_id, phase_name,
             phase_json, last_status, result, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
           ON CONFLICT(session_id) DO UPDATE SET
             subject_key  = excluded.subject_key,
             applicant_id = excluded.applicant_id,
             check_id     = excluded.check_id,
             phase_name   = excluded.phase_name,
             phase_json   = excluded.phase_json,
             last_status  = excluded.last_status,
             result       = excluded.result,
             updated_at   = excluded.updated_at",
          rusqlite::params![
            session_id,
            subject_key,
            applicant_id,
            check_id,
            phase_name,
            phase_json,
            last_status,
            result,
            created_at,
            updated_at,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get(&self, session_id: Uuid) -> Result<Option<WorkflowSession>> {
    self.session_where("session_id", encode_uuid(session_id)).await
  }

  async fn find_session_by_applicant<'a>(
    &'a self,
    applicant_id: &'a str,
  ) -> Result<Option<WorkflowSession>> {
    self.session_where("applicant_id", applicant_id.to_owned()).await
  }

  async fn find_session_by_check<'a>(
    &'a self,
    check_id: &'a str,
  ) -> Result<Option<WorkflowSession>> {
    self.session_where("check_id", check_id.to_owned()).await
  }

  async fn purge_terminal(&self, before: DateTime<Utc>) -> Result<usize> {
    let before_str = encode_dt(before);

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM sessions
           WHERE phase_name IN ('reconciled', 'failed')
             AND updated_at < ?1",
          rusqlite::params![before_str],
        )?)
      })
      .await?;

    if removed > 0 {
      tracing::debug!(removed, "purged terminal sessions");
    }
    Ok(removed)
  }
}

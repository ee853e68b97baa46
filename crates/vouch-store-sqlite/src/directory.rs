//! A local [`IdentityDirectory`] on the `subjects` table.
//!
//! Used when no external directory is configured, and by tests.

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use vouch_core::{
  DirectoryError,
  directory::IdentityDirectory,
  subject::{Subject, SubjectPatch},
};

use crate::{
  Error, Result, SqliteStore,
  encode::{RawSubject, SUBJECT_COLUMNS, encode_dt},
};

impl From<Error> for DirectoryError {
  fn from(err: Error) -> Self {
    match err {
      Error::SubjectNotFound(key) => DirectoryError::SubjectNotFound(key),
      other => DirectoryError::Unavailable(other.to_string()),
    }
  }
}

impl SqliteStore {
  /// Insert a subject, or replace the name and email of an existing one.
  /// The verification fields of an existing record are preserved.
  pub async fn upsert_subject(&self, subject: &Subject) -> Result<()> {
    let key          = subject.subject_key.clone();
    let given        = subject.given_name.clone();
    let family       = subject.family_name.clone();
    let email        = subject.email.clone();
    let applicant_id = subject.applicant_id.clone();
    let idv_status   = subject.idv_status.as_ref().map(|r| r.as_str().to_owned());
    let now          = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO subjects (
             subject_key, given_name, family_name, email,
             applicant_id, idv_status, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
           ON CONFLICT(subject_key) DO UPDATE SET
             given_name  = excluded.given_name,
             family_name = excluded.family_name,
             email       = excluded.email,
             updated_at  = excluded.updated_at",
          rusqlite::params![key, given, family, email, applicant_id, idv_status, now],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn subject_where(
    &self,
    column: &'static str,
    value:  String,
  ) -> Result<Option<Subject>> {
    let raw: Option<RawSubject> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {SUBJECT_COLUMNS} FROM subjects WHERE {column} = ?1");
        Ok(
          conn
            .query_row(&sql, rusqlite::params![value], RawSubject::from_row)
            .optional()?,
        )
      })
      .await?;
    Ok(raw.map(RawSubject::into_subject))
  }

  async fn apply_patch(&self, subject_key: String, patch: SubjectPatch) -> Result<()> {
    let idv_status = patch.idv_status.map(String::from);
    let now        = encode_dt(Utc::now());
    let key        = subject_key.clone();

    // COALESCE keeps the stored value for fields the patch omits.
    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE subjects SET
             applicant_id = COALESCE(?2, applicant_id),
             idv_status   = COALESCE(?3, idv_status),
             updated_at   = ?4
           WHERE subject_key = ?1",
          rusqlite::params![key, patch.applicant_id, idv_status, now],
        )?)
      })
      .await?;

    if updated == 0 {
      return Err(Error::SubjectNotFound(subject_key));
    }
    Ok(())
  }
}

impl IdentityDirectory for SqliteStore {
  async fn get_subject<'a>(&'a self, subject_key: &'a str) -> Result<Subject, DirectoryError> {
    self
      .subject_where("subject_key", subject_key.to_owned())
      .await?
      .ok_or_else(|| DirectoryError::SubjectNotFound(subject_key.to_owned()))
  }

  async fn patch_subject<'a>(
    &'a self,
    subject_key: &'a str,
    patch: &'a SubjectPatch,
  ) -> Result<(), DirectoryError> {
    if patch.is_empty() {
      return Ok(());
    }
    self.apply_patch(subject_key.to_owned(), patch.clone()).await?;
    Ok(())
  }

  async fn find_by_applicant<'a>(
    &'a self,
    applicant_id: &'a str,
  ) -> Result<Option<Subject>, DirectoryError> {
    Ok(self.subject_where("applicant_id", applicant_id.to_owned()).await?)
  }
}

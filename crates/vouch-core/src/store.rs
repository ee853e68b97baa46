//! The `SessionStore` trait.
//!
//! Backends: `MemorySessionStore` in `vouch-workflow` and `SqliteStore` in
//! `vouch-store-sqlite`. The orchestrator depends on this abstraction only.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::session::WorkflowSession;

/// Short-lived storage for in-flight [`WorkflowSession`]s, addressable by any
/// of the run's correlation ids.
pub trait SessionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Insert or replace the session with `session.session_id`.
  fn save<'a>(
    &'a self,
    session: &'a WorkflowSession,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn get(
    &self,
    session_id: Uuid,
  ) -> impl Future<Output = Result<Option<WorkflowSession>, Self::Error>> + Send + '_;

  /// The most recently updated session holding `applicant_id`.
  fn find_session_by_applicant<'a>(
    &'a self,
    applicant_id: &'a str,
  ) -> impl Future<Output = Result<Option<WorkflowSession>, Self::Error>> + Send + 'a;

  /// The session holding `check_id`.
  fn find_session_by_check<'a>(
    &'a self,
    check_id: &'a str,
  ) -> impl Future<Output = Result<Option<WorkflowSession>, Self::Error>> + Send + 'a;

  /// Delete terminal sessions last updated before `before`. Returns the
  /// number removed.
  fn purge_terminal(
    &self,
    before: DateTime<Utc>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}

//! [`MemorySessionStore`] — sessions held in process memory.

use std::{
  collections::HashMap,
  convert::Infallible,
  sync::{Arc, PoisonError, RwLock},
};

use chrono::{DateTime, Utc};
use uuid::Uuid;
use vouch_core::{session::WorkflowSession, store::SessionStore};

/// A [`SessionStore`] that lives and dies with the process. Sessions lost on
/// restart are re-derived by the orchestrator from the directory.
///
/// Cloning is cheap and clones share state.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
  sessions: Arc<RwLock<HashMap<Uuid, WorkflowSession>>>,
}

impl MemorySessionStore {
  pub fn new() -> Self { Self::default() }

  pub fn len(&self) -> usize {
    self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }

  fn find(&self, pred: impl Fn(&WorkflowSession) -> bool) -> Option<WorkflowSession> {
    self
      .sessions
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .values()
      .filter(|s| pred(s))
      .max_by_key(|s| s.updated_at)
      .cloned()
  }
}

impl SessionStore for MemorySessionStore {
  type Error = Infallible;

  async fn save<'a>(&'a self, session: &'a WorkflowSession) -> Result<(), Infallible> {
    self
      .sessions
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(session.session_id, session.clone());
    Ok(())
  }

  async fn get(&self, session_id: Uuid) -> Result<Option<WorkflowSession>, Infallible> {
    Ok(
      self
        .sessions
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&session_id)
        .cloned(),
    )
  }

  async fn find_session_by_applicant<'a>(
    &'a self,
    applicant_id: &'a str,
  ) -> Result<Option<WorkflowSession>, Infallible> {
    Ok(self.find(|s| s.applicant_id.as_deref() == Some(applicant_id)))
  }

  async fn find_session_by_check<'a>(
    &'a self,
    check_id: &'a str,
  ) -> Result<Option<WorkflowSession>, Infallible> {
    Ok(self.find(|s| s.check_id.as_deref() == Some(check_id)))
  }

  async fn purge_terminal(&self, before: DateTime<Utc>) -> Result<usize, Infallible> {
    let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
    let len = sessions.len();
    sessions.retain(|_, s| !(s.phase.is_terminal() && s.updated_at < before));
    Ok(len - sessions.len())
  }
}

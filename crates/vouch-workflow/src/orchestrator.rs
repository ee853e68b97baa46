//! [`Orchestrator`] — the verification state machine.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use vouch_core::{
  Error, ProviderError, Result,
  check::{CaptureOutcome, CaptureToken, CheckResult, CheckStatus, NewApplicant},
  directory::IdentityDirectory,
  provider::VerificationProvider,
  session::{Phase, PhaseName, WorkflowSession},
  store::SessionStore,
  subject::SubjectPatch,
};

use crate::{guard::SessionLocks, timer::PollTimer};

/// The provider is polled this often unless configured otherwise.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct WorkflowConfig {
  pub poll_interval: Duration,
}

impl Default for WorkflowConfig {
  fn default() -> Self { Self { poll_interval: DEFAULT_POLL_INTERVAL } }
}

// ─── Results ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicantStarted {
  pub session_id:   Uuid,
  pub applicant_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckStarted {
  pub session_id: Uuid,
  pub check_id:   String,
  pub status:     CheckStatus,
}

/// What a poll observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
  pub session_id: Uuid,
  pub phase:      PhaseName,
  pub status:     CheckStatus,
  pub result:     Option<CheckResult>,
}

impl From<&WorkflowSession> for PollOutcome {
  fn from(s: &WorkflowSession) -> Self {
    Self {
      session_id: s.session_id,
      phase:      s.phase.name(),
      status:     s.last_status.unwrap_or(CheckStatus::Pending),
      result:     s.result.clone(),
    }
  }
}

// ─── Orchestrator ────────────────────────────────────────────────────────────

/// Drives verification runs. One instance serves any number of concurrent
/// runs; per-run state lives only in the session store.
pub struct Orchestrator<P, D, S> {
  provider:  P,
  directory: D,
  sessions:  S,
  locks:     SessionLocks,
  config:    WorkflowConfig,
}

impl<P, D, S> Orchestrator<P, D, S>
where
  P: VerificationProvider,
  D: IdentityDirectory,
  S: SessionStore,
{
  pub fn new(provider: P, directory: D, sessions: S) -> Self {
    Self::with_config(provider, directory, sessions, WorkflowConfig::default())
  }

  pub fn with_config(provider: P, directory: D, sessions: S, config: WorkflowConfig) -> Self {
    Self {
      provider,
      directory,
      sessions,
      locks: SessionLocks::default(),
      config,
    }
  }

  pub fn config(&self) -> &WorkflowConfig { &self.config }

  #[cfg(test)]
  pub(crate) fn lock_entries(&self) -> usize { self.locks.len() }

  // ── Entry points ────────────────────────────────────────────────────────

  /// Create a provider applicant for `subject_key` and record its id on the
  /// subject's identity record.
  ///
  /// Nothing guards against two concurrent starts for the same subject: both
  /// applicants get created and the directory keeps whichever write lands
  /// last.
  pub async fn start_applicant(
    &self,
    subject_key: &str,
    applicant: NewApplicant,
  ) -> Result<ApplicantStarted> {
    applicant.validate()?;
    let mut session = WorkflowSession::new(subject_key);

    let created = match self.provider.create_applicant(&applicant).await {
      Ok(a) => a,
      Err(e) => return Err(self.record_failure(&mut session, e.into()).await),
    };
    let applicant_id = created.applicant_id;
    session.applicant_id = Some(applicant_id.clone());

    let patch = SubjectPatch::applicant(applicant_id.clone());
    if let Err(e) = self.directory.patch_subject(subject_key, &patch).await {
      return Err(self.record_failure(&mut session, Error::DirectoryWriteFailed(e)).await);
    }

    session.advance(Phase::ApplicantCreated);
    self.persist(&session).await?;
    info!(
      session_id = %session.session_id,
      subject_key,
      applicant_id = %applicant_id,
      "applicant created"
    );

    Ok(ApplicantStarted { session_id: session.session_id, applicant_id })
  }

  /// Start a run for a subject whose names and email come from the directory.
  pub async fn start_for_subject(&self, subject_key: &str) -> Result<ApplicantStarted> {
    let subject = self
      .directory
      .get_subject(subject_key)
      .await
      .map_err(Error::directory_read)?;

    let applicant = NewApplicant {
      given_name:  subject.given_name,
      family_name: subject.family_name,
      email:       subject.email,
    };
    self.start_applicant(subject_key, applicant).await
  }

  /// Issue a capture token for the run holding `applicant_id`.
  ///
  /// Allowed again from `TokenIssued`: a reloaded capture page needs a fresh
  /// single-use token.
  pub async fn issue_token(&self, applicant_id: &str) -> Result<CaptureToken> {
    let located = self.locate_by_applicant(applicant_id).await?;
    let _guard = self.locks.lock(located.session_id).await;
    let mut session = self.load(located.session_id).await?;

    if !matches!(session.phase, Phase::ApplicantCreated | Phase::TokenIssued) {
      return Err(session.invalid("issue a capture token"));
    }

    let token = match self.provider.issue_capture_token(applicant_id).await {
      Ok(t) => t,
      Err(e) => return Err(self.record_failure(&mut session, e.into()).await),
    };

    session.advance(Phase::TokenIssued);
    self.persist(&session).await?;
    info!(session_id = %session.session_id, applicant_id, "capture token issued");
    Ok(token)
  }

  /// Act on the result of the capture step: a failed capture ends the run,
  /// a successful one creates the check.
  pub async fn start_check(
    &self,
    applicant_id: &str,
    capture: CaptureOutcome,
  ) -> Result<CheckStarted> {
    let located = self.locate_by_applicant(applicant_id).await?;
    let _guard = self.locks.lock(located.session_id).await;
    let mut session = self.load(located.session_id).await?;

    if session.phase != Phase::TokenIssued {
      return Err(session.invalid("start a check"));
    }

    if let CaptureOutcome::Failure { error } = capture {
      return Err(self.record_failure(&mut session, Error::CaptureFailed(error)).await);
    }

    let check = match self.provider.create_check(applicant_id).await {
      Ok(c) => c,
      Err(e) => return Err(self.record_failure(&mut session, e.into()).await),
    };

    session.check_id = Some(check.check_id.clone());
    session.last_status = Some(check.status);
    session.advance(Phase::CheckCreated);
    self.persist(&session).await?;
    info!(
      session_id = %session.session_id,
      applicant_id,
      check_id = %check.check_id,
      status = %check.status,
      "check created"
    );

    Ok(CheckStarted {
      session_id: session.session_id,
      check_id:   check.check_id,
      status:     check.status,
    })
  }

  /// One poll tick for `check_id`.
  ///
  /// While the check is running this has no side effects beyond the session's
  /// `last_status`. On completion it reconciles the verdict exactly once;
  /// later calls just return the stored outcome. If another poll of the same
  /// session is still awaiting the provider, the last known status is
  /// returned instead of issuing a second request.
  pub async fn poll_status(&self, check_id: &str) -> Result<PollOutcome> {
    let located = self.locate_by_check(check_id).await?;
    if let Some(settled) = settled(&located)? {
      return Ok(settled);
    }

    let Some(_guard) = self.locks.try_lock(located.session_id) else {
      debug!(session_id = %located.session_id, check_id, "poll already in flight");
      return Ok(PollOutcome::from(&located));
    };
    let mut session = self.load(located.session_id).await?;
    if let Some(settled) = settled(&session)? {
      return Ok(settled);
    }
    if let Some(result) = session.unwritten_result().cloned() {
      self.reconcile_locked(&mut session, result).await?;
      return Ok(PollOutcome::from(&session));
    }
    if !session.phase.is_awaiting_result() {
      return Err(session.invalid("poll a check"));
    }

    let check = match self.provider.get_check(check_id).await {
      Ok(c) => c,
      Err(e) => return Err(self.record_failure(&mut session, e.into()).await),
    };
    debug!(
      session_id = %session.session_id,
      check_id,
      status = %check.status,
      "polled check"
    );

    if check.status.is_complete() {
      let Some(result) = check.result else {
        let err = Error::ProviderUnavailable(format!("check {check_id} is complete without a result"));
        warn!(session_id = %session.session_id, check_id, "{err}");
        return Err(err);
      };
      self.reconcile_locked(&mut session, result).await?;
    } else {
      session.last_status = Some(check.status);
      session.advance(Phase::Polling);
      self.persist(&session).await?;
    }

    Ok(PollOutcome::from(&session))
  }

  /// Write the verdict of a completed check to the subject's identity record.
  ///
  /// Normally triggered by [`poll_status`](Self::poll_status). Calling it for
  /// a session that is already reconciled performs no write. A session whose
  /// earlier write failed is retried with the verdict it already holds.
  pub async fn reconcile(&self, check_id: &str, result: CheckResult) -> Result<PollOutcome> {
    let located = self.locate_by_check(check_id).await?;
    let _guard = self.locks.lock(located.session_id).await;
    let mut session = self.load(located.session_id).await?;
    self.reconcile_locked(&mut session, result).await?;
    Ok(PollOutcome::from(&session))
  }

  /// Poll `check_id` on every tick of `timer` until the run is reconciled.
  ///
  /// Errors end the loop and are returned as-is; a transient provider error
  /// leaves the session resumable by calling this (or `poll_status`) again.
  /// An exhausted timer ends the loop with the last known outcome.
  pub async fn drive_poll<T: PollTimer>(
    &self,
    check_id: &str,
    timer: &mut T,
  ) -> Result<PollOutcome> {
    loop {
      if !timer.tick().await {
        let session = self.locate_by_check(check_id).await?;
        return Ok(PollOutcome::from(&session));
      }
      let outcome = self.poll_status(check_id).await?;
      if outcome.phase == PhaseName::Reconciled {
        return Ok(outcome);
      }
    }
  }

  pub async fn session(&self, session_id: Uuid) -> Result<WorkflowSession> {
    self.load(session_id).await
  }

  /// Delete terminal sessions not touched for `retention`.
  pub async fn purge_terminal(&self, retention: Duration) -> Result<usize> {
    let cutoff = chrono::Duration::from_std(retention)
      .ok()
      .and_then(|r| Utc::now().checked_sub_signed(r))
      .ok_or_else(|| Error::InvalidInput(format!("retention out of range: {retention:?}")))?;
    self
      .sessions
      .purge_terminal(cutoff)
      .await
      .map_err(Error::store)
  }

  // ── Internals ───────────────────────────────────────────────────────────

  async fn reconcile_locked(
    &self,
    session: &mut WorkflowSession,
    result: CheckResult,
  ) -> Result<()> {
    if session.phase == Phase::Reconciled {
      return Ok(());
    }
    let result = match session.unwritten_result() {
      Some(stored) => {
        info!(session_id = %session.session_id, "retrying verdict write");
        stored.clone()
      }
      None if session.phase.is_awaiting_result() => result,
      None => return Err(session.invalid("reconcile a check")),
    };

    session.last_status = Some(CheckStatus::Complete);
    session.result = Some(result.clone());

    let patch = SubjectPatch::idv_status(result.clone());
    if let Err(e) = self.directory.patch_subject(&session.subject_key, &patch).await {
      return Err(self.record_failure(session, Error::DirectoryWriteFailed(e)).await);
    }

    session.advance(Phase::Reconciled);
    self.persist(session).await?;
    info!(
      session_id = %session.session_id,
      subject_key = %session.subject_key,
      result = %result,
      "verification reconciled"
    );
    Ok(())
  }

  /// Fail the session for terminal errors, leave it as-is for transient ones,
  /// and hand the error back for returning.
  async fn record_failure(&self, session: &mut WorkflowSession, err: Error) -> Error {
    if err.is_transient() {
      warn!(
        session_id = %session.session_id,
        phase = %session.phase.name(),
        "transient failure, session left resumable: {err}"
      );
      return err;
    }

    error!(
      session_id = %session.session_id,
      phase = %session.phase.name(),
      kind = %err.kind(),
      "workflow failed: {err}"
    );
    session.fail(&err);
    if let Err(store_err) = self.persist(session).await {
      error!(session_id = %session.session_id, "could not record failure: {store_err}");
    }
    err
  }

  async fn load(&self, session_id: Uuid) -> Result<WorkflowSession> {
    self
      .sessions
      .get(session_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::SessionNotFound(session_id))
  }

  async fn persist(&self, session: &WorkflowSession) -> Result<()> {
    self.sessions.save(session).await.map_err(Error::store)
  }

  /// Find the run holding `applicant_id`, re-deriving it from the directory
  /// when the session store has no record of it.
  async fn locate_by_applicant(&self, applicant_id: &str) -> Result<WorkflowSession> {
    if let Some(s) = self.stored_by_applicant(applicant_id).await? {
      return Ok(s);
    }

    let session_id = derived_session_id("applicant", applicant_id);
    let _guard = self.locks.lock(session_id).await;
    if let Some(s) = self.stored_by_applicant(applicant_id).await? {
      return Ok(s);
    }

    let subject = self
      .directory
      .find_by_applicant(applicant_id)
      .await
      .map_err(Error::directory_read)?
      .ok_or_else(|| Error::UnknownApplicant(applicant_id.to_owned()))?;

    let mut session = WorkflowSession::new(subject.subject_key);
    session.session_id = session_id;
    session.applicant_id = Some(applicant_id.to_owned());
    session.advance(Phase::ApplicantCreated);
    self.persist(&session).await?;
    info!(session_id = %session_id, applicant_id, "re-derived session from directory");
    Ok(session)
  }

  /// Find the run holding `check_id`, re-deriving it from the provider and
  /// the directory when the session store has no record of it.
  async fn locate_by_check(&self, check_id: &str) -> Result<WorkflowSession> {
    if let Some(s) = self.stored_by_check(check_id).await? {
      return Ok(s);
    }

    let session_id = derived_session_id("check", check_id);
    let _guard = self.locks.lock(session_id).await;
    if let Some(s) = self.stored_by_check(check_id).await? {
      return Ok(s);
    }

    let check = match self.provider.get_check(check_id).await {
      Ok(c) => c,
      Err(ProviderError::Rejected { status: 404, .. }) => {
        return Err(Error::UnknownCheck(check_id.to_owned()));
      }
      Err(e) => return Err(e.into()),
    };
    let subject = self
      .directory
      .find_by_applicant(&check.applicant_id)
      .await
      .map_err(Error::directory_read)?
      .ok_or_else(|| Error::UnknownCheck(check_id.to_owned()))?;

    let mut session = WorkflowSession::new(subject.subject_key);
    session.session_id = session_id;
    session.applicant_id = Some(check.applicant_id);
    session.check_id = Some(check_id.to_owned());
    session.last_status = Some(check.status);
    session.advance(Phase::CheckCreated);
    self.persist(&session).await?;
    info!(session_id = %session_id, check_id, "re-derived session from provider");
    Ok(session)
  }

  async fn stored_by_applicant(&self, applicant_id: &str) -> Result<Option<WorkflowSession>> {
    self
      .sessions
      .find_session_by_applicant(applicant_id)
      .await
      .map_err(Error::store)
  }

  async fn stored_by_check(&self, check_id: &str) -> Result<Option<WorkflowSession>> {
    self
      .sessions
      .find_session_by_check(check_id)
      .await
      .map_err(Error::store)
  }
}

/// The outcome of a session that no poll can change any more.
fn settled(session: &WorkflowSession) -> Result<Option<PollOutcome>> {
  match &session.phase {
    Phase::Reconciled => Ok(Some(PollOutcome::from(session))),
    Phase::Failed { .. } if session.unwritten_result().is_none() => {
      Err(session.invalid("poll a check"))
    }
    _ => Ok(None),
  }
}

/// Sessions re-derived from the same correlation id get the same id, so
/// concurrent re-derivations converge on one session.
fn derived_session_id(kind: &str, correlation_id: &str) -> Uuid {
  Uuid::new_v5(
    &Uuid::NAMESPACE_OID,
    format!("vouch:{kind}:{correlation_id}").as_bytes(),
  )
}

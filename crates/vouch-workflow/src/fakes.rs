//! In-process stand-ins for the provider and the directory.

use std::{
  collections::{HashMap, VecDeque},
  sync::{Arc, Mutex},
};

use chrono::Utc;
use tokio::sync::Notify;
use vouch_core::{
  DirectoryError, ProviderError,
  check::{Applicant, CaptureToken, Check, CheckResult, CheckStatus, NewApplicant},
  directory::IdentityDirectory,
  provider::VerificationProvider,
  subject::{Subject, SubjectPatch},
};

// ─── Provider ────────────────────────────────────────────────────────────────

pub type Poll = Result<(CheckStatus, Option<CheckResult>), ProviderError>;

#[derive(Default)]
struct ProviderState {
  applicants:       usize,
  checks:           HashMap<String, String>,
  applicant_error:  Option<ProviderError>,
  token_error:      Option<ProviderError>,
  check_error:      Option<ProviderError>,
  /// Scripted answers to `get_check`; the last one repeats once drained.
  polls:            VecDeque<Poll>,
  last_poll:        Option<Poll>,
  get_check_calls:  usize,
  create_check_calls: usize,
}

/// A provider whose answers are scripted by the test.
#[derive(Clone, Default)]
pub struct FakeProvider {
  state: Arc<Mutex<ProviderState>>,
  /// When set, `get_check` parks until notified.
  gate:  Option<Arc<Notify>>,
}

impl FakeProvider {
  pub fn new() -> Self { Self::default() }

  pub fn gated(gate: Arc<Notify>) -> Self {
    Self { gate: Some(gate), ..Self::default() }
  }

  pub fn script(&self, polls: impl IntoIterator<Item = Poll>) {
    self.state.lock().unwrap().polls.extend(polls);
  }

  pub fn fail_applicant(&self, err: ProviderError) {
    self.state.lock().unwrap().applicant_error = Some(err);
  }

  pub fn fail_token(&self, err: ProviderError) {
    self.state.lock().unwrap().token_error = Some(err);
  }

  pub fn fail_check(&self, err: ProviderError) {
    self.state.lock().unwrap().check_error = Some(err);
  }

  /// Pretend a check was created in an earlier process.
  pub fn know_check(&self, check_id: &str, applicant_id: &str) {
    self
      .state
      .lock()
      .unwrap()
      .checks
      .insert(check_id.into(), applicant_id.into());
  }

  pub fn get_check_calls(&self) -> usize { self.state.lock().unwrap().get_check_calls }

  pub fn create_check_calls(&self) -> usize { self.state.lock().unwrap().create_check_calls }

  pub fn applicants_created(&self) -> usize { self.state.lock().unwrap().applicants }
}

impl VerificationProvider for FakeProvider {
  async fn create_applicant<'a>(
    &'a self,
    _applicant: &'a NewApplicant,
  ) -> Result<Applicant, ProviderError> {
    let mut state = self.state.lock().unwrap();
    if let Some(err) = state.applicant_error.clone() {
      return Err(err);
    }
    state.applicants += 1;
    Ok(Applicant {
      applicant_id: format!("app_{}", state.applicants),
      created_at:   Utc::now(),
    })
  }

  async fn issue_capture_token<'a>(
    &'a self,
    applicant_id: &'a str,
  ) -> Result<CaptureToken, ProviderError> {
    let state = self.state.lock().unwrap();
    match state.token_error.clone() {
      Some(err) => Err(err),
      None => Ok(CaptureToken { token: format!("sdk-token-for-{applicant_id}") }),
    }
  }

  async fn create_check<'a>(&'a self, applicant_id: &'a str) -> Result<Check, ProviderError> {
    let mut state = self.state.lock().unwrap();
    state.create_check_calls += 1;
    if let Some(err) = state.check_error.clone() {
      return Err(err);
    }
    let check_id = format!("chk_{}", state.checks.len() + 1);
    state.checks.insert(check_id.clone(), applicant_id.to_owned());
    Ok(Check {
      check_id,
      applicant_id: applicant_id.to_owned(),
      status: CheckStatus::Pending,
      result: None,
    })
  }

  async fn get_check<'a>(&'a self, check_id: &'a str) -> Result<Check, ProviderError> {
    {
      self.state.lock().unwrap().get_check_calls += 1;
    }
    if let Some(gate) = &self.gate {
      gate.notified().await;
    }

    let mut state = self.state.lock().unwrap();
    let Some(applicant_id) = state.checks.get(check_id).cloned() else {
      return Err(ProviderError::Rejected {
        status:  404,
        message: format!("check {check_id} not found"),
      });
    };
    let poll = match state.polls.pop_front() {
      Some(p) => {
        state.last_poll = Some(p.clone());
        p
      }
      None => state
        .last_poll
        .clone()
        .unwrap_or(Ok((CheckStatus::InProgress, None))),
    };
    let (status, result) = poll?;
    Ok(Check {
      check_id: check_id.to_owned(),
      applicant_id,
      status,
      result,
    })
  }
}

// ─── Directory ───────────────────────────────────────────────────────────────

#[derive(Default)]
struct DirectoryState {
  subjects:    HashMap<String, Subject>,
  patches:     Vec<(String, SubjectPatch)>,
  fail_writes: bool,
}

/// A directory that records every patch it receives.
#[derive(Clone, Default)]
pub struct FakeDirectory {
  state: Arc<Mutex<DirectoryState>>,
}

impl FakeDirectory {
  pub fn with_subject(subject: Subject) -> Self {
    let dir = Self::default();
    dir
      .state
      .lock()
      .unwrap()
      .subjects
      .insert(subject.subject_key.clone(), subject);
    dir
  }

  /// Record an applicant id as if a previous run had written it.
  pub fn set_applicant(&self, subject_key: &str, applicant_id: &str) {
    if let Some(subject) = self.state.lock().unwrap().subjects.get_mut(subject_key) {
      subject.applicant_id = Some(applicant_id.into());
    }
  }

  pub fn fail_writes(&self, fail: bool) { self.state.lock().unwrap().fail_writes = fail; }

  pub fn patches(&self) -> Vec<(String, SubjectPatch)> {
    self.state.lock().unwrap().patches.clone()
  }

  /// Patches that wrote a verification result.
  pub fn status_writes(&self) -> Vec<CheckResult> {
    self
      .patches()
      .into_iter()
      .filter_map(|(_, p)| p.idv_status)
      .collect()
  }

  pub fn subject(&self, key: &str) -> Option<Subject> {
    self.state.lock().unwrap().subjects.get(key).cloned()
  }
}

impl IdentityDirectory for FakeDirectory {
  async fn get_subject<'a>(&'a self, subject_key: &'a str) -> Result<Subject, DirectoryError> {
    self
      .subject(subject_key)
      .ok_or_else(|| DirectoryError::SubjectNotFound(subject_key.to_owned()))
  }

  async fn patch_subject<'a>(
    &'a self,
    subject_key: &'a str,
    patch: &'a SubjectPatch,
  ) -> Result<(), DirectoryError> {
    let mut state = self.state.lock().unwrap();
    if state.fail_writes {
      return Err(DirectoryError::Unavailable("directory is down".into()));
    }
    let subject = state
      .subjects
      .get_mut(subject_key)
      .ok_or_else(|| DirectoryError::SubjectNotFound(subject_key.to_owned()))?;
    patch.apply(subject);
    state.patches.push((subject_key.to_owned(), patch.clone()));
    Ok(())
  }

  async fn find_by_applicant<'a>(
    &'a self,
    applicant_id: &'a str,
  ) -> Result<Option<Subject>, DirectoryError> {
    Ok(
      self
        .state
        .lock()
        .unwrap()
        .subjects
        .values()
        .find(|s| s.applicant_id.as_deref() == Some(applicant_id))
        .cloned(),
    )
  }
}

pub fn jane() -> Subject {
  Subject {
    subject_key:  "jane@example.com".into(),
    given_name:   "Jane".into(),
    family_name:  "Doe".into(),
    email:        "jane@example.com".into(),
    applicant_id: None,
    idv_status:   None,
  }
}

pub fn jane_applicant() -> NewApplicant {
  NewApplicant {
    given_name:  "Jane".into(),
    family_name: "Doe".into(),
    email:       "jane@example.com".into(),
  }
}

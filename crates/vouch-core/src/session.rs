//! Workflow sessions — the explicit, per-run orchestration state.
//!
//! A session ties one subject to the applicant and check of a single
//! verification run, plus the phase the run has reached. Sessions are passed
//! around by id; there is no ambient workflow state anywhere.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, ErrorKind,
  check::{CheckResult, CheckStatus},
};

// ─── Phase ───────────────────────────────────────────────────────────────────

/// Where a run currently stands.
///
/// ```text
/// NotStarted → ApplicantCreated → TokenIssued → CheckCreated → Polling → Reconciled
///      └──────────────┴──────────────┴──────────────┴────────────┴──→ Failed
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Phase {
  NotStarted,
  ApplicantCreated,
  TokenIssued,
  CheckCreated,
  Polling,
  Reconciled,
  Failed { kind: ErrorKind, message: String },
}

/// The discriminant of a [`Phase`], without the failure payload.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PhaseName {
  NotStarted,
  ApplicantCreated,
  TokenIssued,
  CheckCreated,
  Polling,
  Reconciled,
  Failed,
}

impl Phase {
  pub fn name(&self) -> PhaseName {
    match self {
      Self::NotStarted => PhaseName::NotStarted,
      Self::ApplicantCreated => PhaseName::ApplicantCreated,
      Self::TokenIssued => PhaseName::TokenIssued,
      Self::CheckCreated => PhaseName::CheckCreated,
      Self::Polling => PhaseName::Polling,
      Self::Reconciled => PhaseName::Reconciled,
      Self::Failed { .. } => PhaseName::Failed,
    }
  }

  pub fn is_terminal(&self) -> bool {
    matches!(self, Self::Reconciled | Self::Failed { .. })
  }

  /// True once a check exists and its status is being awaited.
  pub fn is_awaiting_result(&self) -> bool {
    matches!(self, Self::CheckCreated | Self::Polling)
  }
}

// ─── Session ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSession {
  pub session_id:   Uuid,
  pub subject_key:  String,
  pub applicant_id: Option<String>,
  pub check_id:     Option<String>,
  pub phase:        Phase,
  /// Last check status observed from the provider.
  pub last_status:  Option<CheckStatus>,
  pub result:       Option<CheckResult>,
  pub created_at:   DateTime<Utc>,
  pub updated_at:   DateTime<Utc>,
}

impl WorkflowSession {
  pub fn new(subject_key: impl Into<String>) -> Self {
    let now = Utc::now();
    Self {
      session_id:   Uuid::new_v4(),
      subject_key:  subject_key.into(),
      applicant_id: None,
      check_id:     None,
      phase:        Phase::NotStarted,
      last_status:  None,
      result:       None,
      created_at:   now,
      updated_at:   now,
    }
  }

  /// Move to `phase`, bumping `updated_at`.
  pub fn advance(&mut self, phase: Phase) {
    self.phase = phase;
    self.updated_at = Utc::now();
  }

  /// Move to [`Phase::Failed`] recording the classification of `err`.
  pub fn fail(&mut self, err: &Error) {
    self.advance(Phase::Failed {
      kind:    err.kind(),
      message: err.to_string(),
    });
  }

  /// Error describing why further operations on a failed session are refused.
  pub fn failure(&self) -> Option<Error> {
    match &self.phase {
      Phase::Failed { kind, message } => Some(Error::SessionFailed {
        kind:    *kind,
        message: message.clone(),
      }),
      _ => None,
    }
  }

  /// The verdict of a run whose final directory write failed, still waiting
  /// to be written.
  pub fn unwritten_result(&self) -> Option<&CheckResult> {
    match &self.phase {
      Phase::Failed { kind: ErrorKind::DirectoryWriteFailed, .. } => self.result.as_ref(),
      _ => None,
    }
  }

  /// Build the error returned when `operation` is invoked in the wrong phase.
  pub fn invalid(&self, operation: &'static str) -> Error {
    self.failure().unwrap_or(Error::InvalidTransition {
      phase: self.phase.name(),
      operation,
    })
  }
}

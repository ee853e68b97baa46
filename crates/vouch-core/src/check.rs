//! Provider-side records: applicants, capture tokens and checks.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Applicant ───────────────────────────────────────────────────────────────

/// Input to [`VerificationProvider::create_applicant`](crate::provider::VerificationProvider::create_applicant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewApplicant {
  pub given_name:  String,
  pub family_name: String,
  pub email:       String,
}

impl NewApplicant {
  /// Reject blank names and obviously malformed email addresses before any
  /// remote call is made.
  pub fn validate(&self) -> Result<()> {
    if self.given_name.trim().is_empty() {
      return Err(Error::InvalidInput("given name is empty".into()));
    }
    if self.family_name.trim().is_empty() {
      return Err(Error::InvalidInput("family name is empty".into()));
    }
    match self.email.split_once('@') {
      Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
      _ => Err(Error::InvalidInput(format!("invalid email: {:?}", self.email))),
    }
  }
}

/// The provider's representation of a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Applicant {
  pub applicant_id: String,
  pub created_at:   DateTime<Utc>,
}

/// Short-lived credential authorising one capture session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureToken {
  pub token: String,
}

impl fmt::Debug for CaptureToken {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CaptureToken").field("token", &"<redacted>").finish()
  }
}

// ─── Capture ─────────────────────────────────────────────────────────────────

/// What the capture step reported back once the subject finished (or
/// abandoned) document and face capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CaptureOutcome {
  Success {
    #[serde(default)]
    data: serde_json::Value,
  },
  Failure {
    error: String,
  },
}

impl Default for CaptureOutcome {
  fn default() -> Self { Self::Success { data: serde_json::Value::Null } }
}

// ─── Check ───────────────────────────────────────────────────────────────────

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
pub enum CheckStatus {
  Pending,
  InProgress,
  Complete,
}

impl CheckStatus {
  /// Map a provider status string onto the three workflow-relevant states.
  ///
  /// Anything that is neither running nor finished (`awaiting_applicant`,
  /// `paused`, `reopened`, ...) counts as pending.
  pub fn from_provider(status: &str) -> Self {
    match status {
      "complete" => Self::Complete,
      "in_progress" => Self::InProgress,
      _ => Self::Pending,
    }
  }

  pub fn is_complete(self) -> bool { matches!(self, Self::Complete) }
}

/// The verdict of a completed check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CheckResult {
  Clear,
  Consider,
  /// Any other verdict the provider may report, kept verbatim.
  Other(String),
}

impl CheckResult {
  pub fn as_str(&self) -> &str {
    match self {
      Self::Clear => "clear",
      Self::Consider => "consider",
      Self::Other(s) => s,
    }
  }

  pub fn is_clear(&self) -> bool { matches!(self, Self::Clear) }
}

impl From<String> for CheckResult {
  fn from(s: String) -> Self {
    match s.as_str() {
      "clear" => Self::Clear,
      "consider" => Self::Consider,
      _ => Self::Other(s),
    }
  }
}

impl From<&str> for CheckResult {
  fn from(s: &str) -> Self { Self::from(s.to_owned()) }
}

impl From<CheckResult> for String {
  fn from(r: CheckResult) -> Self {
    match r {
      CheckResult::Other(s) => s,
      other => other.as_str().to_owned(),
    }
  }
}

impl fmt::Display for CheckResult {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// One verification attempt against an applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Check {
  pub check_id:     String,
  pub applicant_id: String,
  pub status:       CheckStatus,
  /// Only meaningful once `status` is [`CheckStatus::Complete`].
  pub result:       Option<CheckResult>,
}

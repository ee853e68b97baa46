//! Error types for `vouch-core`.
//!
//! Leaf clients report [`ProviderError`] and [`DirectoryError`]. The
//! orchestrator folds both into the workflow-level [`Error`], whose
//! [`ErrorKind`] is what callers see in structured error payloads.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::session::PhaseName;

// ─── Leaf client errors ──────────────────────────────────────────────────────

/// Failure reported by a [`VerificationProvider`](crate::provider::VerificationProvider).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
  /// Transport failure, 5xx, rate limiting or an unreadable response body.
  /// Safe to retry the same step.
  #[error("provider unavailable: {0}")]
  Unavailable(String),

  /// The provider refused the request (4xx). Never retried.
  #[error("provider rejected request ({status}): {message}")]
  Rejected { status: u16, message: String },
}

/// Failure reported by an [`IdentityDirectory`](crate::directory::IdentityDirectory).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DirectoryError {
  #[error("directory unavailable: {0}")]
  Unavailable(String),

  #[error("subject not found: {0}")]
  SubjectNotFound(String),

  #[error("directory rejected request ({status}): {message}")]
  Rejected { status: u16, message: String },
}

// ─── Workflow errors ─────────────────────────────────────────────────────────

/// Stable, machine-readable classification of an [`Error`].
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
  ProviderUnavailable,
  ProviderRejected,
  DirectoryWriteFailed,
  DirectoryUnavailable,
  SubjectNotFound,
  UnknownApplicant,
  UnknownCheck,
  SessionNotFound,
  InvalidTransition,
  SessionFailed,
  CaptureFailed,
  InvalidInput,
  Store,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("provider unavailable: {0}")]
  ProviderUnavailable(String),

  #[error("provider rejected request ({status}): {message}")]
  ProviderRejected { status: u16, message: String },

  /// The verification outcome exists but could not be persisted.
  #[error("directory write failed: {0}")]
  DirectoryWriteFailed(#[source] DirectoryError),

  #[error("directory read failed: {0}")]
  DirectoryUnavailable(#[source] DirectoryError),

  #[error("subject not found: {0}")]
  SubjectNotFound(String),

  #[error("no workflow known for applicant {0}")]
  UnknownApplicant(String),

  #[error("no workflow known for check {0}")]
  UnknownCheck(String),

  #[error("session not found: {0}")]
  SessionNotFound(Uuid),

  #[error("cannot {operation} while session is {phase}")]
  InvalidTransition {
    phase:     PhaseName,
    operation: &'static str,
  },

  #[error("session already failed ({kind}): {message}")]
  SessionFailed { kind: ErrorKind, message: String },

  #[error("capture failed: {0}")]
  CaptureFailed(String),

  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("session store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::ProviderUnavailable(_) => ErrorKind::ProviderUnavailable,
      Self::ProviderRejected { .. } => ErrorKind::ProviderRejected,
      Self::DirectoryWriteFailed(_) => ErrorKind::DirectoryWriteFailed,
      Self::DirectoryUnavailable(_) => ErrorKind::DirectoryUnavailable,
      Self::SubjectNotFound(_) => ErrorKind::SubjectNotFound,
      Self::UnknownApplicant(_) => ErrorKind::UnknownApplicant,
      Self::UnknownCheck(_) => ErrorKind::UnknownCheck,
      Self::SessionNotFound(_) => ErrorKind::SessionNotFound,
      Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
      Self::SessionFailed { .. } => ErrorKind::SessionFailed,
      Self::CaptureFailed(_) => ErrorKind::CaptureFailed,
      Self::InvalidInput(_) => ErrorKind::InvalidInput,
      Self::Store(_) => ErrorKind::Store,
    }
  }

  /// Transient errors leave the session resumable at its current phase.
  pub fn is_transient(&self) -> bool {
    matches!(self, Self::ProviderUnavailable(_) | Self::Store(_))
  }

  /// Wrap a session-store backend error.
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }

  /// Classify a directory failure that happened while reading.
  pub fn directory_read(err: DirectoryError) -> Self {
    match err {
      DirectoryError::SubjectNotFound(key) => Self::SubjectNotFound(key),
      other => Self::DirectoryUnavailable(other),
    }
  }
}

impl From<ProviderError> for Error {
  fn from(err: ProviderError) -> Self {
    match err {
      ProviderError::Unavailable(m) => Self::ProviderUnavailable(m),
      ProviderError::Rejected { status, message } => {
        Self::ProviderRejected { status, message }
      }
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

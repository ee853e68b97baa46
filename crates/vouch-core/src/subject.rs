//! Subject — the person being verified, as held by the identity directory.

use serde::{Deserialize, Serialize};

use crate::check::CheckResult;

/// An identity record. The directory owns it; the workflow only ever writes
/// the two verification fields through a [`SubjectPatch`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
  /// Stable identifier in the directory (a login or email address).
  pub subject_key:  String,
  pub given_name:   String,
  pub family_name:  String,
  pub email:        String,
  /// Cross-reference to the provider-side applicant, once one exists.
  pub applicant_id: Option<String>,
  /// The most recent reconciled verification result.
  pub idv_status:   Option<CheckResult>,
}

/// A partial update to a [`Subject`]. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectPatch {
  pub applicant_id: Option<String>,
  pub idv_status:   Option<CheckResult>,
}

impl SubjectPatch {
  pub fn applicant(applicant_id: impl Into<String>) -> Self {
    Self { applicant_id: Some(applicant_id.into()), idv_status: None }
  }

  pub fn idv_status(result: CheckResult) -> Self {
    Self { applicant_id: None, idv_status: Some(result) }
  }

  pub fn is_empty(&self) -> bool {
    self.applicant_id.is_none() && self.idv_status.is_none()
  }

  /// Apply this patch to `subject` in place.
  pub fn apply(&self, subject: &mut Subject) {
    if let Some(id) = &self.applicant_id {
      subject.applicant_id = Some(id.clone());
    }
    if let Some(result) = &self.idv_status {
      subject.idv_status = Some(result.clone());
    }
  }
}

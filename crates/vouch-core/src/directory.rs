//! The `IdentityDirectory` trait.

use std::future::Future;

use crate::{
  DirectoryError,
  subject::{Subject, SubjectPatch},
};

/// Read/write access to subjects' identity records.
///
/// The directory is the single source of truth other systems read; the
/// workflow only ever touches it through [`patch_subject`](Self::patch_subject).
pub trait IdentityDirectory: Send + Sync {
  /// Fetch a subject by key. Missing subjects are
  /// [`DirectoryError::SubjectNotFound`].
  fn get_subject<'a>(
    &'a self,
    subject_key: &'a str,
  ) -> impl Future<Output = Result<Subject, DirectoryError>> + Send + 'a;

  /// Partially update a subject. Fields left `None` in `patch` are untouched,
  /// and repeating a patch with the same values must be harmless.
  fn patch_subject<'a>(
    &'a self,
    subject_key: &'a str,
    patch: &'a SubjectPatch,
  ) -> impl Future<Output = Result<(), DirectoryError>> + Send + 'a;

  /// Reverse lookup from a provider applicant id to the subject holding it.
  fn find_by_applicant<'a>(
    &'a self,
    applicant_id: &'a str,
  ) -> impl Future<Output = Result<Option<Subject>, DirectoryError>> + Send + 'a;
}

//! The `VerificationProvider` trait.
//!
//! Implemented by `vouch-clients` against the provider's REST API and by
//! in-process fakes in tests.

use std::future::Future;

use crate::{
  ProviderError,
  check::{Applicant, CaptureToken, Check, NewApplicant},
};

/// Abstraction over the third-party document/biometric verification service.
///
/// Every method is a remote call. Transport failures surface as
/// [`ProviderError::Unavailable`]; application-level refusals as
/// [`ProviderError::Rejected`].
pub trait VerificationProvider: Send + Sync {
  /// Register a new applicant. The provider does not deduplicate, so callers
  /// must not invoke this twice for the same subject within one run.
  fn create_applicant<'a>(
    &'a self,
    applicant: &'a NewApplicant,
  ) -> impl Future<Output = Result<Applicant, ProviderError>> + Send + 'a;

  /// Issue a single-use capture token scoped to the configured referrer.
  fn issue_capture_token<'a>(
    &'a self,
    applicant_id: &'a str,
  ) -> impl Future<Output = Result<CaptureToken, ProviderError>> + Send + 'a;

  /// Request a check over the client's fixed report set.
  fn create_check<'a>(
    &'a self,
    applicant_id: &'a str,
  ) -> impl Future<Output = Result<Check, ProviderError>> + Send + 'a;

  /// Fetch the current status (and, once complete, result) of a check.
  fn get_check<'a>(
    &'a self,
    check_id: &'a str,
  ) -> impl Future<Output = Result<Check, ProviderError>> + Send + 'a;
}

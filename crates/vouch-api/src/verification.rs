//! Handlers for the verification flow.
//!
//! | Method | Path | Body |
//! |--------|------|------|
//! | `POST` | `/applicant` | `{"subjectKey"?, "givenName", "familyName", "email"}` |
//! | `POST` | `/subjects/{key}/applicant` | none |
//! | `POST` | `/sdk` | `{"applicantId"}` |
//! | `POST` | `/check` | `{"applicantId", "capture"?}` |
//! | `POST` | `/status` | `{"checkId"}` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vouch_core::{
  check::{CaptureOutcome, CheckResult, CheckStatus, NewApplicant},
  directory::IdentityDirectory,
  provider::VerificationProvider,
  session::PhaseName,
  store::SessionStore,
};
use vouch_workflow::{ApplicantStarted, Orchestrator};

use crate::error::ApiError;

type Orch<P, D, S> = State<Arc<Orchestrator<P, D, S>>>;

// ─── Applicant ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantBody {
  /// Directory key of the subject; the email when omitted.
  pub subject_key: Option<String>,
  pub given_name:  String,
  pub family_name: String,
  pub email:       String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantResponse {
  pub session_id:   Uuid,
  pub applicant_id: String,
}

impl From<ApplicantStarted> for ApplicantResponse {
  fn from(s: ApplicantStarted) -> Self {
    Self { session_id: s.session_id, applicant_id: s.applicant_id }
  }
}

/// `POST /applicant`
pub async fn start_applicant<P, D, S>(
  State(orch): Orch<P, D, S>,
  Json(body): Json<ApplicantBody>,
) -> Result<Json<ApplicantResponse>, ApiError>
where
  P: VerificationProvider,
  D: IdentityDirectory,
  S: SessionStore,
{
  let subject_key = body.subject_key.unwrap_or_else(|| body.email.clone());
  let applicant = NewApplicant {
    given_name:  body.given_name,
    family_name: body.family_name,
    email:       body.email,
  };
  let started = orch.start_applicant(&subject_key, applicant).await?;
  Ok(Json(started.into()))
}

/// `POST /subjects/{key}/applicant`
pub async fn start_for_subject<P, D, S>(
  State(orch): Orch<P, D, S>,
  Path(subject_key): Path<String>,
) -> Result<Json<ApplicantResponse>, ApiError>
where
  P: VerificationProvider,
  D: IdentityDirectory,
  S: SessionStore,
{
  let started = orch.start_for_subject(&subject_key).await?;
  Ok(Json(started.into()))
}

// ─── Capture token ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantRef {
  pub applicant_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
  pub capture_token: String,
}

/// `POST /sdk`
pub async fn issue_token<P, D, S>(
  State(orch): Orch<P, D, S>,
  Json(body): Json<ApplicantRef>,
) -> Result<Json<TokenResponse>, ApiError>
where
  P: VerificationProvider,
  D: IdentityDirectory,
  S: SessionStore,
{
  let token = orch.issue_token(&body.applicant_id).await?;
  Ok(Json(TokenResponse { capture_token: token.token }))
}

// ─── Check ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckBody {
  pub applicant_id: String,
  #[serde(default)]
  pub capture:      CaptureOutcome,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
  pub check_id: String,
  pub status:   CheckStatus,
}

/// `POST /check`
pub async fn start_check<P, D, S>(
  State(orch): Orch<P, D, S>,
  Json(body): Json<CheckBody>,
) -> Result<Json<CheckResponse>, ApiError>
where
  P: VerificationProvider,
  D: IdentityDirectory,
  S: SessionStore,
{
  let started = orch.start_check(&body.applicant_id, body.capture).await?;
  Ok(Json(CheckResponse { check_id: started.check_id, status: started.status }))
}

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRef {
  pub check_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
  pub status: CheckStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub result: Option<CheckResult>,
  pub phase:  PhaseName,
}

/// `POST /status` — one poll tick.
pub async fn poll_status<P, D, S>(
  State(orch): Orch<P, D, S>,
  Json(body): Json<CheckRef>,
) -> Result<Json<StatusResponse>, ApiError>
where
  P: VerificationProvider,
  D: IdentityDirectory,
  S: SessionStore,
{
  let outcome = orch.poll_status(&body.check_id).await?;
  Ok(Json(StatusResponse {
    status: outcome.status,
    result: outcome.result,
    phase:  outcome.phase,
  }))
}

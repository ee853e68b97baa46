//! [`OnfidoClient`] — the Onfido v3.6 implementation of [`VerificationProvider`].

use std::{fmt, time::Duration};

use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;
use vouch_core::{
  ProviderError,
  check::{Applicant, CaptureToken, Check, CheckResult, CheckStatus, NewApplicant},
  provider::VerificationProvider,
};

use crate::{
  Result,
  http::{self, Failure},
};

// ─── Config ──────────────────────────────────────────────────────────────────

/// Connection settings for the Onfido API.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct OnfidoConfig {
  /// Region-specific API root, including the version segment.
  pub base_url:     String,
  pub api_token:    String,
  /// Referrer pattern capture tokens are scoped to.
  pub referrer:     String,
  /// Reports requested for every check.
  pub report_names: Vec<String>,
  pub timeout_secs: u64,
}

impl Default for OnfidoConfig {
  fn default() -> Self {
    Self {
      base_url:     "https://api.us.onfido.com/v3.6".into(),
      api_token:    String::new(),
      referrer:     "*://*/*".into(),
      report_names: vec!["document".into(), "facial_similarity_photo".into()],
      timeout_secs: 30,
    }
  }
}

impl fmt::Debug for OnfidoConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("OnfidoConfig")
      .field("base_url", &self.base_url)
      .field("api_token", &"<redacted>")
      .field("referrer", &self.referrer)
      .field("report_names", &self.report_names)
      .field("timeout_secs", &self.timeout_secs)
      .finish()
  }
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ApplicantRequest<'a> {
  first_name: &'a str,
  last_name:  &'a str,
  email:      &'a str,
}

#[derive(Deserialize)]
struct ApplicantResponse {
  id:         String,
  #[serde(default)]
  created_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct SdkTokenRequest<'a> {
  applicant_id: &'a str,
  referrer:     &'a str,
}

#[derive(Deserialize)]
struct SdkTokenResponse {
  token: String,
}

#[derive(Serialize)]
struct CheckRequest<'a> {
  applicant_id: &'a str,
  report_names: &'a [String],
}

#[derive(Deserialize)]
struct CheckResponse {
  id:           String,
  applicant_id: String,
  status:       String,
  #[serde(default)]
  result:       Option<String>,
}

impl From<CheckResponse> for Check {
  fn from(c: CheckResponse) -> Self {
    Self {
      check_id:     c.id,
      applicant_id: c.applicant_id,
      status:       CheckStatus::from_provider(&c.status),
      result:       c.result.map(CheckResult::from),
    }
  }
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Async client for the Onfido REST API.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct OnfidoClient {
  client: Client,
  base:   Url,
  config: OnfidoConfig,
}

impl OnfidoClient {
  pub fn new(config: OnfidoConfig) -> Result<Self> {
    let client = http::build_client(Duration::from_secs(config.timeout_secs))?;
    let base = http::parse_base(&config.base_url)?;
    Ok(Self { client, base, config })
  }

  fn auth(&self, req: RequestBuilder) -> RequestBuilder {
    req.header(
      reqwest::header::AUTHORIZATION,
      format!("Token token={}", self.config.api_token),
    )
  }

  async fn send<T: serde::de::DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, Failure> {
    let resp = self.auth(req).send().await?;
    http::decode(http::check(resp).await?).await
  }

  /// `POST /applicants`
  async fn post_applicant(&self, applicant: &NewApplicant) -> Result<Applicant, Failure> {
    let body = ApplicantRequest {
      first_name: &applicant.given_name,
      last_name:  &applicant.family_name,
      email:      &applicant.email,
    };
    let created: ApplicantResponse = self
      .send(self.client.post(http::join(&self.base, &["applicants"])).json(&body))
      .await?;
    debug!(applicant_id = %created.id, "onfido applicant created");
    Ok(Applicant {
      applicant_id: created.id,
      created_at:   created.created_at.unwrap_or_else(Utc::now),
    })
  }

  /// `POST /sdk_token`
  async fn post_sdk_token(&self, applicant_id: &str) -> Result<CaptureToken, Failure> {
    let body = SdkTokenRequest { applicant_id, referrer: &self.config.referrer };
    let issued: SdkTokenResponse = self
      .send(self.client.post(http::join(&self.base, &["sdk_token"])).json(&body))
      .await?;
    Ok(CaptureToken { token: issued.token })
  }

  /// `POST /checks`
  async fn post_check(&self, applicant_id: &str) -> Result<Check, Failure> {
    let body = CheckRequest { applicant_id, report_names: &self.config.report_names };
    let created: CheckResponse = self
      .send(self.client.post(http::join(&self.base, &["checks"])).json(&body))
      .await?;
    debug!(check_id = %created.id, applicant_id, status = %created.status, "onfido check created");
    Ok(created.into())
  }

  /// `GET /checks/{id}`
  async fn fetch_check(&self, check_id: &str) -> Result<Check, Failure> {
    let fetched: CheckResponse = self
      .send(self.client.get(http::join(&self.base, &["checks", check_id])))
      .await?;
    Ok(fetched.into())
  }
}

impl VerificationProvider for OnfidoClient {
  async fn create_applicant<'a>(
    &'a self,
    applicant: &'a NewApplicant,
  ) -> Result<Applicant, ProviderError> {
    Ok(self.post_applicant(applicant).await?)
  }

  async fn issue_capture_token<'a>(
    &'a self,
    applicant_id: &'a str,
  ) -> Result<CaptureToken, ProviderError> {
    Ok(self.post_sdk_token(applicant_id).await?)
  }

  async fn create_check<'a>(&'a self, applicant_id: &'a str) -> Result<Check, ProviderError> {
    Ok(self.post_check(applicant_id).await?)
  }

  async fn get_check<'a>(&'a self, check_id: &'a str) -> Result<Check, ProviderError> {
    Ok(self.fetch_check(check_id).await?)
  }
}

//! [`OktaClient`] — the Okta users API as an [`IdentityDirectory`].
//!
//! Subjects are Okta users addressed by login (or id). The applicant id and
//! verification status live in two custom profile attributes whose names are
//! configurable.

use std::{fmt, time::Duration};

use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;
use vouch_core::{
  DirectoryError,
  check::CheckResult,
  directory::IdentityDirectory,
  subject::{Subject, SubjectPatch},
};

use crate::{
  Result,
  http::{self, Failure},
};

// ─── Config ──────────────────────────────────────────────────────────────────

/// Connection settings for an Okta org.
#[derive(Clone, Deserialize)]
pub struct OktaConfig {
  /// e.g. `https://example.okta.com`
  pub org_url:             String,
  pub api_token:           String,
  #[serde(default = "default_applicant_attribute")]
  pub applicant_attribute: String,
  #[serde(default = "default_status_attribute")]
  pub status_attribute:    String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs:        u64,
}

fn default_applicant_attribute() -> String { "onfidoApplicantId".into() }
fn default_status_attribute() -> String { "onfidoIdvStatus".into() }
fn default_timeout_secs() -> u64 { 30 }

impl OktaConfig {
  pub fn new(org_url: impl Into<String>, api_token: impl Into<String>) -> Self {
    Self {
      org_url:             org_url.into(),
      api_token:           api_token.into(),
      applicant_attribute: default_applicant_attribute(),
      status_attribute:    default_status_attribute(),
      timeout_secs:        default_timeout_secs(),
    }
  }
}

impl fmt::Debug for OktaConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("OktaConfig")
      .field("org_url", &self.org_url)
      .field("api_token", &"<redacted>")
      .field("applicant_attribute", &self.applicant_attribute)
      .field("status_attribute", &self.status_attribute)
      .field("timeout_secs", &self.timeout_secs)
      .finish()
  }
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct OktaUser {
  #[serde(default)]
  id:      String,
  profile: Map<String, Value>,
}

impl OktaUser {
  /// The key this user is addressed by: the login, else the Okta id.
  fn key(&self) -> Option<String> {
    text(&self.profile, "login").or_else(|| Some(self.id.clone()).filter(|id| !id.is_empty()))
  }
}

fn text(profile: &Map<String, Value>, key: &str) -> Option<String> {
  profile
    .get(key)
    .and_then(Value::as_str)
    .filter(|s| !s.is_empty())
    .map(str::to_owned)
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Async client for the Okta users API.
#[derive(Clone)]
pub struct OktaClient {
  client: Client,
  base:   Url,
  config: OktaConfig,
}

impl OktaClient {
  pub fn new(config: OktaConfig) -> Result<Self> {
    let client = http::build_client(Duration::from_secs(config.timeout_secs))?;
    let base = http::parse_base(&config.org_url)?;
    Ok(Self { client, base, config })
  }

  fn auth(&self, req: RequestBuilder) -> RequestBuilder {
    req.header(
      reqwest::header::AUTHORIZATION,
      format!("SSWS {}", self.config.api_token),
    )
  }

  fn user_url(&self, subject_key: &str) -> Url {
    http::join(&self.base, &["api", "v1", "users", subject_key])
  }

  fn to_subject(&self, subject_key: String, profile: &Map<String, Value>) -> Subject {
    Subject {
      subject_key,
      given_name:   text(profile, "firstName").unwrap_or_default(),
      family_name:  text(profile, "lastName").unwrap_or_default(),
      email:        text(profile, "email").unwrap_or_default(),
      applicant_id: text(profile, &self.config.applicant_attribute),
      idv_status:   text(profile, &self.config.status_attribute).map(CheckResult::from),
    }
  }

  fn profile_update(&self, patch: &SubjectPatch) -> Value {
    let mut profile = Map::new();
    if let Some(id) = &patch.applicant_id {
      profile.insert(self.config.applicant_attribute.clone(), Value::from(id.as_str()));
    }
    if let Some(status) = &patch.idv_status {
      profile.insert(self.config.status_attribute.clone(), Value::from(status.as_str()));
    }
    serde_json::json!({ "profile": profile })
  }

  /// Map a 404 on a user path to `SubjectNotFound`.
  async fn user_request(
    &self,
    subject_key: &str,
    req: RequestBuilder,
  ) -> Result<OktaUser, DirectoryError> {
    let resp = self.auth(req).send().await.map_err(Failure::from)?;
    if resp.status() == StatusCode::NOT_FOUND {
      return Err(DirectoryError::SubjectNotFound(subject_key.to_owned()));
    }
    let resp = http::check(resp).await?;
    Ok(http::decode(resp).await?)
  }

  /// `GET /api/v1/users?search=profile.<attr> eq "<id>"`
  async fn search_by_applicant(&self, applicant_id: &str) -> Result<Vec<OktaUser>, Failure> {
    let search = format!(
      "profile.{} eq \"{}\"",
      self.config.applicant_attribute,
      applicant_id.replace('"', "\\\"")
    );
    let req = self
      .client
      .get(http::join(&self.base, &["api", "v1", "users"]))
      .query(&[("search", search)]);
    let resp = self.auth(req).send().await?;
    http::decode(http::check(resp).await?).await
  }
}

impl IdentityDirectory for OktaClient {
  async fn get_subject<'a>(&'a self, subject_key: &'a str) -> Result<Subject, DirectoryError> {
    let req = self.client.get(self.user_url(subject_key));
    let user = self.user_request(subject_key, req).await?;
    Ok(self.to_subject(subject_key.to_owned(), &user.profile))
  }

  /// `POST /api/v1/users/{key}` — Okta treats POST as a partial update.
  async fn patch_subject<'a>(
    &'a self,
    subject_key: &'a str,
    patch: &'a SubjectPatch,
  ) -> Result<(), DirectoryError> {
    if patch.is_empty() {
      return Ok(());
    }
    let req = self
      .client
      .post(self.user_url(subject_key))
      .json(&self.profile_update(patch));
    self.user_request(subject_key, req).await?;
    debug!(subject_key, "okta profile updated");
    Ok(())
  }

  async fn find_by_applicant<'a>(
    &'a self,
    applicant_id: &'a str,
  ) -> Result<Option<Subject>, DirectoryError> {
    let users = self.search_by_applicant(applicant_id).await?;

    // The search is eventually consistent; only trust exact matches.
    // Users with neither a login nor an id are skipped.
    let found = users
      .into_iter()
      .filter(|u| {
        text(&u.profile, &self.config.applicant_attribute).as_deref() == Some(applicant_id)
      })
      .find_map(|u| u.key().map(|key| (key, u)));
    Ok(found.map(|(key, u)| self.to_subject(key, &u.profile)))
  }
}

//! Response classification shared by both clients.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use vouch_core::{DirectoryError, ProviderError};

use crate::{Error, Result};

/// Why a remote call did not produce a usable body.
#[derive(Debug)]
pub(crate) enum Failure {
  Unavailable(String),
  Rejected { status: u16, message: String },
}

impl From<Failure> for ProviderError {
  fn from(f: Failure) -> Self {
    match f {
      Failure::Unavailable(m) => Self::Unavailable(m),
      Failure::Rejected { status, message } => Self::Rejected { status, message },
    }
  }
}

impl From<Failure> for DirectoryError {
  fn from(f: Failure) -> Self {
    match f {
      Failure::Unavailable(m) => Self::Unavailable(m),
      Failure::Rejected { status, message } => Self::Rejected { status, message },
    }
  }
}

impl From<reqwest::Error> for Failure {
  fn from(e: reqwest::Error) -> Self { Self::Unavailable(e.to_string()) }
}

pub(crate) fn build_client(timeout: Duration) -> Result<Client> {
  Ok(Client::builder().timeout(timeout).build()?)
}

/// Parse a base url that later gets path segments appended.
pub(crate) fn parse_base(url: &str) -> Result<Url> {
  let parsed = Url::parse(url).map_err(|e| Error::BaseUrl {
    url:    url.to_owned(),
    reason: e.to_string(),
  })?;
  if parsed.cannot_be_a_base() {
    return Err(Error::BaseUrl {
      url:    url.to_owned(),
      reason: "not a hierarchical url".into(),
    });
  }
  Ok(parsed)
}

/// `base` with `segments` appended, each percent-encoded.
pub(crate) fn join(base: &Url, segments: &[&str]) -> Url {
  let mut url = base.clone();
  if let Ok(mut path) = url.path_segments_mut() {
    path.pop_if_empty().extend(segments);
  }
  url
}

/// Pass 2xx responses through; turn everything else into a [`Failure`].
pub(crate) async fn check(resp: Response) -> Result<Response, Failure> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }

  let body = resp.text().await.unwrap_or_default();
  let message = error_message(&body).unwrap_or_else(|| {
    status.canonical_reason().unwrap_or("request failed").to_owned()
  });

  if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
    Err(Failure::Unavailable(format!("{status}: {message}")))
  } else {
    Err(Failure::Rejected { status: status.as_u16(), message })
  }
}

/// Decode a JSON body; a body that does not match is treated as unavailable.
pub(crate) async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, Failure> {
  resp
    .json()
    .await
    .map_err(|e| Failure::Unavailable(format!("undecodable response: {e}")))
}

/// Pull a human-readable message out of an error body.
///
/// Onfido nests it under `error.message`, Okta uses `errorSummary`.
fn error_message(body: &str) -> Option<String> {
  let value: serde_json::Value = serde_json::from_str(body).ok()?;
  value
    .pointer("/error/message")
    .or_else(|| value.get("errorSummary"))
    .and_then(|m| m.as_str())
    .map(str::to_owned)
}

//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::{
  collections::VecDeque,
  io,
  sync::{Arc, Mutex},
};

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
  response::IntoResponse as _,
};
use serde_json::{Value, json};
use tower::ServiceExt as _;
use vouch_core::{
  DirectoryError, Error, ErrorKind, ProviderError,
  check::{Applicant, CaptureToken, Check, CheckResult, CheckStatus, NewApplicant},
  directory::IdentityDirectory,
  provider::VerificationProvider,
  subject::Subject,
};
use vouch_store_sqlite::SqliteStore;
use vouch_workflow::Orchestrator;

use crate::{ApiError, api_router, error::status_for};

// ─── Stub provider ───────────────────────────────────────────────────────────

#[derive(Default)]
struct StubProvider {
  applicants: Mutex<usize>,
  polls:      Mutex<VecDeque<(CheckStatus, Option<CheckResult>)>>,
  down:       bool,
}

impl VerificationProvider for StubProvider {
  async fn create_applicant<'a>(
    &'a self,
    _applicant: &'a NewApplicant,
  ) -> Result<Applicant, ProviderError> {
    if self.down {
      return Err(ProviderError::Unavailable("connection refused".into()));
    }
    let mut n = self.applicants.lock().unwrap();
    *n += 1;
    Ok(Applicant { applicant_id: format!("app_{n}"), created_at: fixed_time() })
  }

  async fn issue_capture_token<'a>(
    &'a self,
    applicant_id: &'a str,
  ) -> Result<CaptureToken, ProviderError> {
    Ok(CaptureToken { token: format!("sdk-{applicant_id}") })
  }

  async fn create_check<'a>(&'a self, applicant_id: &'a str) -> Result<Check, ProviderError> {
    Ok(Check {
      check_id:     "chk_1".into(),
      applicant_id: applicant_id.to_owned(),
      status:       CheckStatus::Pending,
      result:       None,
    })
  }

  async fn get_check<'a>(&'a self, check_id: &'a str) -> Result<Check, ProviderError> {
    let (status, result) = self
      .polls
      .lock()
      .unwrap()
      .pop_front()
      .unwrap_or((CheckStatus::InProgress, None));
    Ok(Check {
      check_id: check_id.to_owned(),
      applicant_id: "app_1".into(),
      status,
      result,
    })
  }
}

fn fixed_time() -> chrono::DateTime<chrono::Utc> {
  "2024-05-01T12:00:00Z".parse().unwrap()
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

async fn setup(provider: StubProvider) -> (Router, SqliteStore) {
  let store = SqliteStore::open_in_memory().await.unwrap();
  store
    .upsert_subject(&Subject {
      subject_key:  "jane@example.com".into(),
      given_name:   "Jane".into(),
      family_name:  "Doe".into(),
      email:        "jane@example.com".into(),
      applicant_id: None,
      idv_status:   None,
    })
    .await
    .unwrap();
  let orch = Orchestrator::new(provider, store.clone(), store.clone());
  (api_router(Arc::new(orch)), store)
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  let body = match body {
    Some(v) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(v.to_string())
    }
    None => Body::empty(),
  };
  let resp = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
  (status, value)
}

fn jane_body() -> Value {
  json!({ "givenName": "Jane", "familyName": "Doe", "email": "jane@example.com" })
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn applicant_defaults_subject_key_to_email() {
  let (app, store) = setup(StubProvider::default()).await;

  let (status, body) = call(&app, "POST", "/applicant", Some(jane_body())).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["applicantId"], "app_1");
  assert!(body["sessionId"].is_string());

  let subject = store.get_subject("jane@example.com").await.unwrap();
  assert_eq!(subject.applicant_id.as_deref(), Some("app_1"));
}

#[tokio::test]
async fn full_flow_reconciles_once() {
  let provider = StubProvider::default();
  provider.polls.lock().unwrap().extend([
    (CheckStatus::InProgress, None),
    (CheckStatus::Complete, Some(CheckResult::Clear)),
  ]);
  let (app, store) = setup(provider).await;

  call(&app, "POST", "/applicant", Some(jane_body())).await;

  let (status, body) = call(&app, "POST", "/sdk", Some(json!({ "applicantId": "app_1" }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["captureToken"], "sdk-app_1");

  let (status, body) = call(&app, "POST", "/check", Some(json!({ "applicantId": "app_1" }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "checkId": "chk_1", "status": "pending" }));

  let (_, body) = call(&app, "POST", "/status", Some(json!({ "checkId": "chk_1" }))).await;
  assert_eq!(body["status"], "in_progress");
  assert!(body.get("result").is_none());

  let (_, body) = call(&app, "POST", "/status", Some(json!({ "checkId": "chk_1" }))).await;
  assert_eq!(body["status"], "complete");
  assert_eq!(body["result"], "clear");
  assert_eq!(body["phase"], "reconciled");

  let subject = store.get_subject("jane@example.com").await.unwrap();
  assert_eq!(subject.idv_status, Some(CheckResult::Clear));
}

#[tokio::test]
async fn start_for_subject_reads_directory() {
  let (app, _) = setup(StubProvider::default()).await;

  let (status, body) = call(&app, "POST", "/subjects/jane@example.com/applicant", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["applicantId"], "app_1");

  let (status, body) = call(&app, "POST", "/subjects/ghost@example.com/applicant", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["kind"], "subject_not_found");
}

#[tokio::test]
async fn capture_failure_is_unprocessable() {
  let (app, _) = setup(StubProvider::default()).await;
  call(&app, "POST", "/applicant", Some(jane_body())).await;
  call(&app, "POST", "/sdk", Some(json!({ "applicantId": "app_1" }))).await;

  let body = json!({
    "applicantId": "app_1",
    "capture": { "outcome": "failure", "error": "user closed the capture flow" }
  });
  let (status, body) = call(&app, "POST", "/check", Some(body)).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["kind"], "capture_failed");

  let (status, body) = call(&app, "POST", "/sdk", Some(json!({ "applicantId": "app_1" }))).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["kind"], "session_failed");
}

#[tokio::test]
async fn out_of_order_call_conflicts() {
  let (app, _) = setup(StubProvider::default()).await;
  call(&app, "POST", "/applicant", Some(jane_body())).await;

  let (status, body) = call(&app, "POST", "/check", Some(json!({ "applicantId": "app_1" }))).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["kind"], "invalid_transition");
}

#[tokio::test]
async fn invalid_email_is_bad_request() {
  let (app, _) = setup(StubProvider::default()).await;
  let body = json!({ "givenName": "Jane", "familyName": "Doe", "email": "jane" });

  let (status, body) = call(&app, "POST", "/applicant", Some(body)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["kind"], "invalid_input");
}

#[tokio::test]
async fn provider_outage_is_service_unavailable() {
  let (app, _) = setup(StubProvider { down: true, ..StubProvider::default() }).await;

  let (status, body) = call(&app, "POST", "/applicant", Some(jane_body())).await;
  assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
  assert_eq!(body["kind"], "provider_unavailable");
  assert!(body["message"].as_str().unwrap().contains("connection refused"));
}

#[tokio::test]
async fn unknown_session_is_not_found() {
  let (app, _) = setup(StubProvider::default()).await;

  let uri = format!("/sessions/{}", uuid::Uuid::new_v4());
  let (status, body) = call(&app, "GET", &uri, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["kind"], "session_not_found");

  let (status, _) = call(&app, "GET", "/sessions/not-a-uuid", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn session_is_inspectable() {
  let (app, _) = setup(StubProvider::default()).await;
  let (_, started) = call(&app, "POST", "/applicant", Some(jane_body())).await;

  let uri = format!("/sessions/{}", started["sessionId"].as_str().unwrap());
  let (status, body) = call(&app, "GET", &uri, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["phase"]["name"], "applicant_created");
  assert_eq!(body["applicant_id"], "app_1");
}

#[test]
fn directory_write_failure_maps_to_bad_gateway() {
  assert_eq!(status_for(ErrorKind::DirectoryWriteFailed), StatusCode::BAD_GATEWAY);
  assert_eq!(status_for(ErrorKind::Store), StatusCode::INTERNAL_SERVER_ERROR);
}

/// Collects formatted log lines for inspection.
#[derive(Clone, Default)]
struct LogSink(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogSink {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    self.0.lock().unwrap().extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> { Ok(()) }
}

#[test]
fn server_side_failures_are_logged() {
  let sink = LogSink::default();
  let subscriber = tracing_subscriber::fmt()
    .with_writer({
      let sink = sink.clone();
      move || sink.clone()
    })
    .with_ansi(false)
    .finish();

  tracing::subscriber::with_default(subscriber, || {
    let write = Error::DirectoryWriteFailed(DirectoryError::Unavailable("okta said 429".into()));
    assert_eq!(ApiError(write).into_response().status(), StatusCode::BAD_GATEWAY);

    let outage = Error::ProviderUnavailable("onfido timed out".into());
    assert_eq!(ApiError(outage).into_response().status(), StatusCode::SERVICE_UNAVAILABLE);

    let missing = Error::UnknownCheck("chk_quiet".into());
    assert_eq!(ApiError(missing).into_response().status(), StatusCode::NOT_FOUND);
  });

  let logs = String::from_utf8(sink.0.lock().unwrap().clone()).unwrap();
  assert!(logs.contains("okta said 429"));
  assert!(logs.contains("onfido timed out"));
  assert!(!logs.contains("chk_quiet"));
}

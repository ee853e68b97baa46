//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use vouch_core::{Error, ErrorKind};

/// An error returned by an API handler.
///
/// Rendered as `{"kind": "...", "message": "..."}`.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub Error);

pub fn status_for(kind: ErrorKind) -> StatusCode {
  match kind {
    ErrorKind::ProviderUnavailable | ErrorKind::DirectoryUnavailable => {
      StatusCode::SERVICE_UNAVAILABLE
    }
    ErrorKind::ProviderRejected | ErrorKind::CaptureFailed => StatusCode::UNPROCESSABLE_ENTITY,
    ErrorKind::DirectoryWriteFailed => StatusCode::BAD_GATEWAY,
    ErrorKind::SubjectNotFound
    | ErrorKind::UnknownApplicant
    | ErrorKind::UnknownCheck
    | ErrorKind::SessionNotFound => StatusCode::NOT_FOUND,
    ErrorKind::InvalidTransition | ErrorKind::SessionFailed => StatusCode::CONFLICT,
    ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
    ErrorKind::Store => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let kind = self.0.kind();
    let status = status_for(kind);
    if status == StatusCode::INTERNAL_SERVER_ERROR {
      tracing::error!(%kind, "request failed: {}", self.0);
    } else if status.is_server_error() {
      tracing::warn!(%kind, %status, "upstream failure: {}", self.0);
    }
    let body = json!({ "kind": kind, "message": self.0.to_string() });
    (status, Json(body)).into_response()
  }
}

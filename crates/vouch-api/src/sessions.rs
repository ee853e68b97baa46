//! `GET /sessions/{id}` — inspect a workflow session.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use uuid::Uuid;
use vouch_core::{
  directory::IdentityDirectory,
  provider::VerificationProvider,
  session::WorkflowSession,
  store::SessionStore,
};
use vouch_workflow::Orchestrator;

use crate::error::ApiError;

pub async fn get_one<P, D, S>(
  State(orch): State<Arc<Orchestrator<P, D, S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<WorkflowSession>, ApiError>
where
  P: VerificationProvider,
  D: IdentityDirectory,
  S: SessionStore,
{
  Ok(Json(orch.session(id).await?))
}

//! JSON REST API for the verification workflow.
//!
//! Exposes an axum [`Router`] backed by an [`Orchestrator`]. Auth, TLS and
//! transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", vouch_api::api_router(orchestrator.clone()))
//! ```

pub mod error;
pub mod sessions;
pub mod verification;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use vouch_core::{
  directory::IdentityDirectory, provider::VerificationProvider, store::SessionStore,
};
use vouch_workflow::Orchestrator;

pub use error::ApiError;

/// Build a fully-materialised API router for `orchestrator`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<P, D, S>(orchestrator: Arc<Orchestrator<P, D, S>>) -> Router<()>
where
  P: VerificationProvider + 'static,
  D: IdentityDirectory + 'static,
  S: SessionStore + 'static,
{
  Router::new()
    .route("/applicant", post(verification::start_applicant::<P, D, S>))
    .route(
      "/subjects/{key}/applicant",
      post(verification::start_for_subject::<P, D, S>),
    )
    .route("/sdk", post(verification::issue_token::<P, D, S>))
    .route("/check", post(verification::start_check::<P, D, S>))
    .route("/status", post(verification::poll_status::<P, D, S>))
    .route("/sessions/{id}", get(sessions::get_one::<P, D, S>))
    .with_state(orchestrator)
}

#[cfg(test)]
mod tests;

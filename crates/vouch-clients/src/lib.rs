//! HTTP implementations of the verification provider and identity directory.
//!
//! [`OnfidoClient`] speaks the Onfido v3.6 REST API; [`OktaClient`] speaks
//! the Okta users API. Both classify failures the same way: transport
//! errors, 5xx, 429 and undecodable bodies are "unavailable" (retryable),
//! any other non-2xx is "rejected".

mod http;
pub mod okta;
pub mod onfido;

pub use okta::{OktaClient, OktaConfig};
pub use onfido::{OnfidoClient, OnfidoConfig};

/// Errors building a client from its configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("invalid base url {url:?}: {reason}")]
  BaseUrl { url: String, reason: String },

  #[error("failed to build HTTP client: {0}")]
  Http(#[from] reqwest::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

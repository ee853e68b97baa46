//! Core types and trait definitions for the Vouch verification workflow.
//!
//! This crate is deliberately free of HTTP, database and runtime
//! dependencies. The provider client, the identity directory and the session
//! store are modelled as traits here; concrete backends live in sibling
//! crates.

pub mod check;
pub mod directory;
pub mod error;
pub mod provider;
pub mod session;
pub mod store;
pub mod subject;

pub use error::{DirectoryError, Error, ErrorKind, ProviderError, Result};

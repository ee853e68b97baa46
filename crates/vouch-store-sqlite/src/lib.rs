//! SQLite backend for Vouch.
//!
//! [`SqliteStore`] implements both [`SessionStore`](vouch_core::store::SessionStore)
//! and a local [`IdentityDirectory`](vouch_core::directory::IdentityDirectory),
//! wrapping [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime.

mod directory;
mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

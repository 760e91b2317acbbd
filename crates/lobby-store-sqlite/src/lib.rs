//! SQLite and filesystem backends for the Lobby record and photo stores.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime.

mod encode;
mod photos;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use photos::PhotoDir;
pub use store::{DEFAULT_BUSY_TIMEOUT, SqliteStore};

#[cfg(test)]
mod tests;

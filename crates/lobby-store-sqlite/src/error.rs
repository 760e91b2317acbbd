//! Error type for `lobby-store-sqlite`.

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("photo storage error: {0}")]
  Io(#[from] std::io::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("decode error: {0}")]
  Decode(String),

  /// A stored approval whose status and timestamps disagree.
  #[error("approval {0} is stored in an inconsistent state")]
  Corrupt(uuid::Uuid),

  #[error("email {0:?} is already registered")]
  DuplicateEmail(String),

  #[error("visitor not found: {0}")]
  VisitorNotFound(uuid::Uuid),
}

impl Error {
  /// Whether SQLite gave up waiting for a lock held by another connection.
  pub fn is_busy(&self) -> bool {
    matches!(
      self,
      Error::Database(tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(f, _)))
        if matches!(f.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
  }
}

impl From<Error> for lobby_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::DuplicateEmail(email) => Self::DuplicateVisitor(email),
      Error::VisitorNotFound(id) => Self::VisitorNotFound(id),
      e if e.is_busy() => Self::StoreBusy,
      other => Self::storage(other),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

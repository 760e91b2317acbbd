//! Error types for `lobby-core`.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::approval::{Action, ApprovalStatus};

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid {field}: {reason}")]
  Validation {
    field:  &'static str,
    reason: String,
  },

  #[error("visitor not found: {0}")]
  VisitorNotFound(Uuid),

  #[error("approval not found: {0}")]
  ApprovalNotFound(Uuid),

  #[error("no photo on file for visitor {0}")]
  PhotoNotFound(Uuid),

  #[error("cannot {action} approval {approval_id}: status is {from}")]
  InvalidTransition {
    approval_id: Uuid,
    action:      Action,
    from:        ApprovalStatus,
  },

  #[error("a visitor with email {0:?} already exists")]
  DuplicateVisitor(String),

  #[error("approval {0} is contended; retry the request")]
  Contention(Uuid),

  #[error("record store is busy; retry the request")]
  StoreBusy,

  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
    Self::Validation { field, reason: reason.into() }
  }

  /// Wrap any backend failure that has no more specific classification.
  pub fn storage(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Storage(Box::new(e))
  }

  /// The caller-facing category of this error.
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Validation { .. } => ErrorKind::Validation,
      Self::VisitorNotFound(_) | Self::ApprovalNotFound(_) | Self::PhotoNotFound(_) => {
        ErrorKind::NotFound
      }
      Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
      Self::DuplicateVisitor(_) => ErrorKind::Conflict,
      Self::Contention(_) | Self::StoreBusy => ErrorKind::Contention,
      Self::Storage(_) => ErrorKind::Storage,
    }
  }

  /// Whether repeating the same request unchanged may succeed.
  pub fn is_retryable(&self) -> bool {
    matches!(self.kind(), ErrorKind::Contention)
  }
}

/// Coarse error categories surfaced at the gateway boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  Validation,
  NotFound,
  InvalidTransition,
  Conflict,
  Contention,
  Storage,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

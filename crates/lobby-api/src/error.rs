//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{StatusCode, header},
  response::{IntoResponse, Response},
};
use lobby_core::ErrorKind;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] lobby_core::Error),

  /// The request could not be decoded far enough to reach the workflow.
  #[error("bad request: {0}")]
  BadRequest(String),
}

impl ApiError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      ApiError::Core(e) => e.kind(),
      ApiError::BadRequest(_) => ErrorKind::Validation,
    }
  }

  /// Whether the client should retry the same request later.
  pub fn is_retryable(&self) -> bool {
    matches!(self, ApiError::Core(e) if e.is_retryable())
  }
}

fn status_for(kind: ErrorKind) -> StatusCode {
  match kind {
    ErrorKind::Validation => StatusCode::BAD_REQUEST,
    ErrorKind::NotFound => StatusCode::NOT_FOUND,
    ErrorKind::InvalidTransition | ErrorKind::Conflict => StatusCode::CONFLICT,
    ErrorKind::Contention => StatusCode::SERVICE_UNAVAILABLE,
    ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let kind = self.kind();
    let status = status_for(kind);
    let message = self.to_string();

    if kind == ErrorKind::Storage {
      tracing::error!(error = %message, "request failed");
    } else {
      tracing::debug!(error = %message, ?kind, "request rejected");
    }

    let body = Json(json!({ "error": message, "kind": kind }));
    if self.is_retryable() {
      (status, [(header::RETRY_AFTER, "1")], body).into_response()
    } else {
      (status, body).into_response()
    }
  }
}

//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// A transition refused by the permission matrix. 403.
  #[error("forbidden: {0}")]
  Denied(String),

  /// The loan changed under the caller. 409; safe to re-read and retry.
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Denied(m) => (StatusCode::FORBIDDEN, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

impl From<mikopo_workflow::Error> for ApiError {
  fn from(e: mikopo_workflow::Error) -> Self {
    use mikopo_workflow::Error as W;
    match e {
      W::LoanNotFound(id) => ApiError::NotFound(format!("loan {id} not found")),
      W::Denied { reason } => ApiError::Denied(reason),
      e @ W::Conflict { .. } => ApiError::Conflict(e.to_string()),
      W::Store(e) => ApiError::Store(e),
    }
  }
}

impl ApiError {
  /// Wrap a store-level error.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

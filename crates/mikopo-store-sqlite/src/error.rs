//! Error type for `mikopo-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] mikopo_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// Loan or member writes against an agency that was never created.
  #[error("agency not found: {0}")]
  AgencyNotFound(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

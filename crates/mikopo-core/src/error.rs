//! Error types for `mikopo-core`.
//!
//! Most failures live in the crates that produce them; core only owns the
//! decode errors for its own string discriminants.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown status discriminant: {0:?}")]
  UnknownStatus(String),

  #[error("unknown role discriminant: {0:?}")]
  UnknownRole(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

//! Error type for `mikopo-workflow`.
//!
//! Only three kinds of failure ever reach a caller: a denied transition, a
//! missing loan, and a primary-store failure (including the optimistic
//! concurrency conflict). Mirror, agency-audit, and notification failures are
//! degraded to log lines inside the orchestrator.

use mikopo_core::{actor::Role, loan::LoanStatus, policy::LoanAction};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("loan not found: {0}")]
  LoanNotFound(Uuid),

  /// The human-readable reason is shown to the end user verbatim.
  #[error("{reason}")]
  Denied { reason: String },

  #[error(
    "loan {loan_id} changed concurrently: expected {expected}, found {actual}"
  )]
  Conflict {
    loan_id:  Uuid,
    expected: LoanStatus,
    actual:   LoanStatus,
  },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  pub(crate) fn denied_action(
    action: LoanAction,
    role: Role,
    status: LoanStatus,
  ) -> Self {
    Self::Denied {
      reason: format!("role {role} may not {action} a loan in {status} state"),
    }
  }

  pub(crate) fn denied_edge(
    from: LoanStatus,
    to: LoanStatus,
    role: Role,
  ) -> Self {
    Self::Denied {
      reason: format!("role {role} may not move a loan from {from} to {to}"),
    }
  }
}

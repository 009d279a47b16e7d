//! Loan workflow orchestration for Mikopo.
//!
//! [`LoanWorkflow`] is the top-level entry surface: submit, approve, reject,
//! disburse, close. Each entry point sequences permission check → dual-store
//! write → audit append → detached notification fan-out, generic over the
//! storage and delivery traits in [`mikopo_core::store`].

pub mod error;

mod notify;
mod transition;
mod workflow;

#[cfg(test)]
mod tests;

pub use error::{Error, Result};
pub use transition::TransitionReceipt;

use std::sync::Arc;

use mikopo_core::store::{Directory, LedgerMirror, LoanStore, Notifier};

/// The loan workflow orchestrator.
///
/// Holds its collaborators behind [`Arc`]s so the notification fan-out can be
/// detached onto the runtime; cloning is cheap.
pub struct LoanWorkflow<S, L, D, N> {
  pub(crate) store:     Arc<S>,
  pub(crate) ledger:    Arc<L>,
  pub(crate) directory: Arc<D>,
  pub(crate) notifier:  Arc<N>,
}

impl<S, L, D, N> Clone for LoanWorkflow<S, L, D, N> {
  fn clone(&self) -> Self {
    Self {
      store:     Arc::clone(&self.store),
      ledger:    Arc::clone(&self.ledger),
      directory: Arc::clone(&self.directory),
      notifier:  Arc::clone(&self.notifier),
    }
  }
}

impl<S, L, D, N> LoanWorkflow<S, L, D, N>
where
  S: LoanStore + 'static,
  L: LedgerMirror + 'static,
  D: Directory + 'static,
  N: Notifier + 'static,
{
  pub fn new(
    store: Arc<S>,
    ledger: Arc<L>,
    directory: Arc<D>,
    notifier: Arc<N>,
  ) -> Self {
    Self { store, ledger, directory, notifier }
  }
}

//! JSON REST API for Mikopo.
//!
//! Exposes an axum [`Router`] backed by any primary store implementing the
//! [`mikopo_core::store`] traits plus a [`LedgerMirror`] for the relational
//! side. Auth, TLS, and transport concerns are the caller's responsibility;
//! the caller's identity arrives in each request body and is trusted as-is.

pub mod agencies;
pub mod entitlements;
pub mod error;
pub mod loans;
pub mod notifications;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use mikopo_core::store::{Directory, LedgerMirror, LoanStore, Notifier};
use mikopo_workflow::LoanWorkflow;
use serde::Deserialize;


// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:        String,
  pub port:        u16,
  /// Primary (document-side) database file.
  pub store_path:  PathBuf,
  /// Relational ledger mirror database file.
  pub ledger_path: PathBuf,
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
///
/// The primary store serves triple duty: it is the [`LoanStore`] as well as
/// the [`Directory`] and [`Notifier`] the workflow fans notifications out
/// through.
pub struct AppState<S, L> {
  pub workflow: LoanWorkflow<S, L, S, S>,
  pub store:    Arc<S>,
}

impl<S, L> Clone for AppState<S, L> {
  fn clone(&self) -> Self {
    Self {
      workflow: self.workflow.clone(),
      store:    Arc::clone(&self.store),
    }
  }
}

impl<S, L> AppState<S, L>
where
  S: LoanStore + Directory + Notifier + 'static,
  L: LedgerMirror + 'static,
{
  pub fn new(store: Arc<S>, ledger: Arc<L>) -> Self {
    let workflow = LoanWorkflow::new(
      Arc::clone(&store),
      ledger,
      Arc::clone(&store),
      Arc::clone(&store),
    );
    Self { workflow, store }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
pub fn router<S, L>(state: AppState<S, L>) -> Router
where
  S: LoanStore + Directory + Notifier + 'static,
  L: LedgerMirror + 'static,
{
  Router::new()
    // Agencies & members
    .route("/agencies", post(agencies::create::<S, L>))
    .route("/agencies/{agency_id}", get(agencies::get_one::<S, L>))
    .route(
      "/agencies/{agency_id}/members",
      post(agencies::add_member::<S, L>),
    )
    // Loans
    .route(
      "/agencies/{agency_id}/loans",
      get(loans::list::<S, L>).post(loans::create::<S, L>),
    )
    .route(
      "/agencies/{agency_id}/loans/{loan_id}",
      get(loans::get_one::<S, L>),
    )
    // Lifecycle transitions
    .route(
      "/agencies/{agency_id}/loans/{loan_id}/submit",
      post(loans::submit::<S, L>),
    )
    .route(
      "/agencies/{agency_id}/loans/{loan_id}/approve",
      post(loans::approve::<S, L>),
    )
    .route(
      "/agencies/{agency_id}/loans/{loan_id}/reject",
      post(loans::reject::<S, L>),
    )
    .route(
      "/agencies/{agency_id}/loans/{loan_id}/disburse",
      post(loans::disburse::<S, L>),
    )
    .route(
      "/agencies/{agency_id}/loans/{loan_id}/close",
      post(loans::close::<S, L>),
    )
    // Audit
    .route(
      "/agencies/{agency_id}/loans/{loan_id}/audit",
      get(loans::audit::<S, L>),
    )
    .route("/agencies/{agency_id}/audit", get(agencies::audit::<S, L>))
    // Entitlements
    .route(
      "/agencies/{agency_id}/features/{feature}",
      get(entitlements::check::<S, L>),
    )
    // Notifications
    .route(
      "/users/{user_id}/notifications",
      get(notifications::list::<S, L>),
    )
    .with_state(state)
}

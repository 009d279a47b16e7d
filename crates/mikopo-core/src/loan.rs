//! Loan types — the unit of work the lifecycle machine governs.
//!
//! A loan moves through its lifecycle only via whitelisted transitions (see
//! [`crate::policy`]). Status-bearing fields (`approval`, `disbursed_at`,
//! `closed_at`) are written once by the transition that reaches them and are
//! never mutated afterwards; a later review decision replaces the `approval`
//! record wholesale rather than editing it in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use uuid::Uuid;

// ─── Lifecycle states ────────────────────────────────────────────────────────

/// The lifecycle states of a loan.
///
/// Normal progression is `Draft → Pending → UnderReview → Approved →
/// Disbursed → Active → Closed`; `Rejected` is the alternate terminal branch
/// out of review. The edge set itself lives in [`crate::policy`].
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display,
  EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LoanStatus {
  Draft,
  Pending,
  UnderReview,
  Approved,
  Rejected,
  Disbursed,
  Active,
  Closed,
}

impl LoanStatus {
  /// Terminal states have no outgoing edges.
  pub fn is_terminal(&self) -> bool {
    matches!(self, Self::Rejected | Self::Closed)
  }
}

// ─── Review decision ─────────────────────────────────────────────────────────

/// The outcome of a review step.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Decision {
  Approved,
  Rejected,
}

/// The record of a review decision. Written once per approve/reject call;
/// superseded only by a later decision record, never edited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approval {
  pub decision:        Decision,
  pub reviewed_by:     Uuid,
  pub reviewed_at:     DateTime<Utc>,
  pub notes:           Option<String>,
  pub previous_status: LoanStatus,
  pub new_status:      LoanStatus,
}

// ─── Loan ────────────────────────────────────────────────────────────────────

/// A loan, scoped to its owning agency (tenant).
///
/// `amount_minor` is the principal in minor currency units (e.g. cents).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
  pub loan_id:      Uuid,
  pub agency_id:    Uuid,
  pub status:       LoanStatus,
  pub amount_minor: i64,
  /// The loan officer responsible for this loan.
  pub officer_id:   Uuid,
  pub created_by:   Uuid,
  pub created_at:   DateTime<Utc>,
  /// The latest review decision, if any.
  pub approval:     Option<Approval>,
  pub disbursed_at: Option<DateTime<Utc>>,
  pub disbursed_by: Option<Uuid>,
  pub closed_at:    Option<DateTime<Utc>>,
  pub closed_by:    Option<Uuid>,
}

/// Input to [`crate::store::LoanStore::add_loan`]. New loans always start in
/// [`LoanStatus::Draft`]; the id and `created_at` are set by the store.
#[derive(Debug, Clone)]
pub struct NewLoan {
  pub agency_id:       Uuid,
  pub officer_id:      Uuid,
  pub created_by:      Uuid,
  /// Role of the creator, recorded on the intake audit entry.
  pub created_by_role: crate::actor::Role,
  pub amount_minor:    i64,
}

// ─── Transition write ────────────────────────────────────────────────────────

/// The per-edge update a store applies for a permitted transition.
///
/// `expected` is the status the permission check was evaluated against; the
/// primary write is conditional on the loan still holding it, which is what
/// makes concurrent transitions on the same loan surface as conflicts.
#[derive(Debug, Clone)]
pub struct StatusWrite {
  pub expected:     LoanStatus,
  pub target:       LoanStatus,
  pub performed_by: Uuid,
  pub at:           DateTime<Utc>,
  /// Set on the approve/reject edge; stored on the loan and embedded in the
  /// audit entry for that edge.
  pub approval:     Option<Approval>,
}

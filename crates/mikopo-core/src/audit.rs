//! Audit trail types.
//!
//! Audit entries are immutable and append-only: the system never edits or
//! deletes a prior entry. Each committed transition produces one loan-scoped
//! entry (the primary compliance record) and one agency-scoped rollup copy
//! (best-effort secondary).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::{
  actor::Role,
  loan::{Approval, LoanStatus},
};

/// What a given audit entry records.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuditAction {
  /// Draft intake — the loan entered the store.
  Created,
  /// A committed lifecycle transition.
  StatusChange,
}

/// One append-only audit record. For a `StatusChange` the embedded `approval`
/// carries the review decision when the audited edge was an approve/reject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
  pub entry_id:          Uuid,
  pub loan_id:           Uuid,
  pub agency_id:         Uuid,
  pub action:            AuditAction,
  pub previous_status:   Option<LoanStatus>,
  pub new_status:        LoanStatus,
  pub performed_by:      Uuid,
  pub performed_by_role: Role,
  /// Server-assigned; per-loan entries are monotonically non-decreasing.
  pub at:                DateTime<Utc>,
  pub notes:             Option<String>,
  pub approval:          Option<Approval>,
}

/// Input to [`crate::store::LoanStore::append_loan_audit`]. The id and
/// timestamp are set by the store.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
  pub loan_id:           Uuid,
  pub agency_id:         Uuid,
  pub action:            AuditAction,
  pub previous_status:   Option<LoanStatus>,
  pub new_status:        LoanStatus,
  pub performed_by:      Uuid,
  pub performed_by_role: Role,
  pub notes:             Option<String>,
  pub approval:          Option<Approval>,
}

//! The storage and delivery traits the workflow is generic over.
//!
//! [`LoanStore`] is the document-side primary store — the system of record
//! for the application. [`LedgerMirror`] is the relational secondary used for
//! billing and reporting; its writes are best-effort. [`Directory`] resolves
//! notification recipients and [`Notifier`] delivers to them.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use uuid::Uuid;

use crate::{
  actor::Role,
  agency::{Agency, Member, PlanType},
  audit::{AuditEntry, NewAuditEntry},
  loan::{Loan, LoanStatus, NewLoan, StatusWrite},
  notification::{NewNotification, Notification},
};

// ─── Transition outcome ──────────────────────────────────────────────────────

/// Result of a conditional status write against the primary store.
///
/// Contention and absence are outcomes, not store errors: the store's own
/// error type is reserved for genuine persistence failures.
#[derive(Debug, Clone)]
pub enum TransitionOutcome {
  /// The write committed; carries the updated loan.
  Applied(Loan),
  /// The loan no longer holds the expected status.
  Conflict { actual: LoanStatus },
  /// No loan with that id exists in the agency.
  Missing,
}

// ─── Primary store ───────────────────────────────────────────────────────────

/// Abstraction over the document-side primary store.
///
/// Loan and audit writes are scoped by `agency_id`; implementations must not
/// read or write across tenant boundaries. The audit tables are append-only —
/// no update or delete is ever issued against them.
pub trait LoanStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Agencies & members ────────────────────────────────────────────────

  fn add_agency(
    &self,
    name: String,
    plan: PlanType,
  ) -> impl Future<Output = Result<Agency, Self::Error>> + Send + '_;

  fn get_agency(
    &self,
    agency_id: Uuid,
  ) -> impl Future<Output = Result<Option<Agency>, Self::Error>> + Send + '_;

  fn add_member(
    &self,
    agency_id: Uuid,
    user_id: Uuid,
    role: Role,
  ) -> impl Future<Output = Result<Member, Self::Error>> + Send + '_;

  // ── Loans ─────────────────────────────────────────────────────────────

  /// Create a draft loan. The store assigns the id and `created_at` and
  /// records a `Created` audit entry.
  fn add_loan(
    &self,
    input: NewLoan,
  ) -> impl Future<Output = Result<Loan, Self::Error>> + Send + '_;

  /// Retrieve a loan by id within an agency. Returns `None` if not found.
  fn get_loan(
    &self,
    agency_id: Uuid,
    loan_id: Uuid,
  ) -> impl Future<Output = Result<Option<Loan>, Self::Error>> + Send + '_;

  /// List an agency's loans, optionally filtered by status.
  fn list_loans(
    &self,
    agency_id: Uuid,
    status: Option<LoanStatus>,
  ) -> impl Future<Output = Result<Vec<Loan>, Self::Error>> + Send + '_;

  /// Apply a permitted transition, conditional on the loan still holding
  /// `write.expected`. Status-bearing fields (`approval`, `disbursed_*`,
  /// `closed_*`) are set from the write as the target status requires.
  fn apply_transition(
    &self,
    agency_id: Uuid,
    loan_id: Uuid,
    write: StatusWrite,
  ) -> impl Future<Output = Result<TransitionOutcome, Self::Error>> + Send + '_;

  // ── Audit — append-only writes ────────────────────────────────────────

  /// Append to the loan-scoped audit log — the primary compliance record.
  /// The store assigns the id and timestamp.
  fn append_loan_audit(
    &self,
    entry: NewAuditEntry,
  ) -> impl Future<Output = Result<AuditEntry, Self::Error>> + Send + '_;

  /// Append a committed entry to the agency-wide rollup stream. Callers
  /// treat a failure here as best-effort (logged, never surfaced).
  fn append_agency_audit<'a>(
    &'a self,
    entry: &'a AuditEntry,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Audit — reads ─────────────────────────────────────────────────────

  /// A loan's audit trail, ordered by timestamp.
  fn list_loan_audit(
    &self,
    agency_id: Uuid,
    loan_id: Uuid,
  ) -> impl Future<Output = Result<Vec<AuditEntry>, Self::Error>> + Send + '_;

  /// The agency-wide rollup stream, ordered by timestamp.
  fn list_agency_audit(
    &self,
    agency_id: Uuid,
  ) -> impl Future<Output = Result<Vec<AuditEntry>, Self::Error>> + Send + '_;
}

// ─── Relational mirror ───────────────────────────────────────────────────────

/// The relational secondary store. Only `status`, `approved_by`, and
/// `updated_at` are mirrored; everything else lives in the primary.
///
/// The workflow attempts the mirror write before the primary write and logs
/// (but never surfaces) a failure — the documented availability-over-
/// consistency trade-off. Divergence is repaired by out-of-band
/// reconciliation.
pub trait LedgerMirror: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn mirror_transition<'a>(
    &'a self,
    agency_id: Uuid,
    loan_id: Uuid,
    write: &'a StatusWrite,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

// ─── Recipient resolution ────────────────────────────────────────────────────

/// Resolves which users hold given roles within an agency.
pub trait Directory: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn members_with_roles<'a>(
    &'a self,
    agency_id: Uuid,
    roles: &'a [Role],
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + 'a;
}

// ─── Delivery ────────────────────────────────────────────────────────────────

/// Delivers messages to a user's inbox.
pub trait Notifier: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn send(
    &self,
    input: NewNotification,
  ) -> impl Future<Output = Result<Notification, Self::Error>> + Send + '_;

  /// A user's inbox, newest first.
  fn list_for_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Notification>, Self::Error>> + Send + '_;
}

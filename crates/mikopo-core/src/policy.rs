//! The lifecycle permission matrix.
//!
//! Pure, total functions over (state, state, role): no I/O, no clock, no
//! panics. The matrix is a whitelist — any triple not explicitly allowed is
//! denied, which covers same-state and backward transitions by construction.

use strum::{Display, EnumString};

use crate::{actor::Role, loan::LoanStatus};

// ─── Actions ─────────────────────────────────────────────────────────────────

/// The operations a caller can request on a loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum LoanAction {
  Submit,
  Approve,
  Reject,
  Disburse,
  Close,
}

// ─── Edge whitelist ──────────────────────────────────────────────────────────

/// Whether `role` may move a loan along the single edge `current → target`.
///
/// Composite operations (approve/reject from `Pending`, disburse with
/// auto-activation) are sequences of these atomic edges; each edge is checked
/// and audited separately by the orchestrator.
pub fn can_transition(
  current: LoanStatus,
  target: LoanStatus,
  role: Role,
) -> bool {
  use LoanStatus::*;
  use Role::*;

  match (current, target) {
    (Draft, Pending) => matches!(role, Admin | Manager | LoanOfficer),
    (Pending, UnderReview) => role.has_review_authority(),
    (UnderReview, Approved) => role.has_review_authority(),
    (UnderReview, Rejected) => role.has_review_authority(),
    (Approved, Disbursed) => role.can_disburse(),
    (Disbursed, Active) => role.can_disburse(),
    (Active, Closed) => matches!(role, Admin | Manager | Accountant),
    // Deny by default: same-state, backward, and every unlisted edge.
    _ => false,
  }
}

// ─── Action gate ─────────────────────────────────────────────────────────────

/// Whether `role` may request `action` on a loan in `current` state.
///
/// `is_owner` is whether the actor is the loan's assigned officer or its
/// creator; it only matters for [`LoanAction::Submit`], where a loan officer
/// may submit their own loans but not a colleague's. Role and state checks
/// are evaluated independently; both must pass.
pub fn can_perform(
  action: LoanAction,
  role: Role,
  current: LoanStatus,
  is_owner: bool,
) -> bool {
  use LoanStatus::*;
  use Role::*;

  match action {
    LoanAction::Submit => {
      current == Draft
        && (matches!(role, Admin | Manager)
          || (role == LoanOfficer && is_owner))
    }
    LoanAction::Approve | LoanAction::Reject => {
      matches!(current, Pending | UnderReview) && role.has_review_authority()
    }
    LoanAction::Disburse => current == Approved && role.can_disburse(),
    LoanAction::Close => {
      current == Active && matches!(role, Admin | Manager | Accountant)
    }
  }
}

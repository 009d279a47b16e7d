//! The generic transition routine — one permission-checked, audited edge.
//!
//! Ordering within one edge is strict: permission check → ledger mirror
//! (best-effort) → primary document write (decides the outcome) → loan-scoped
//! audit (hard) → agency-scoped audit (best-effort) → detached notification
//! fan-out. A denied edge produces no side effects at all.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mikopo_core::{
  actor::Actor,
  audit::{AuditAction, NewAuditEntry},
  loan::{Approval, Decision, Loan, LoanStatus, StatusWrite},
  notification::LoanEvent,
  policy,
  store::{Directory, LedgerMirror, LoanStore, Notifier, TransitionOutcome},
};

use crate::{Error, LoanWorkflow, Result, notify};

// ─── Receipt ─────────────────────────────────────────────────────────────────

/// A committed transition, carrying the previous status for caller-side
/// messaging.
#[derive(Debug, Clone)]
pub struct TransitionReceipt {
  pub loan:     Loan,
  pub previous: LoanStatus,
}

// ─── Edge ────────────────────────────────────────────────────────────────────

/// One atomic edge to perform. Entry points build these; composite operations
/// are sequences of them, each checked and audited separately.
pub(crate) struct Edge {
  pub target:   LoanStatus,
  pub notes:    Option<String>,
  /// Set on the approve/reject edge; becomes the loan's approval record.
  pub decision: Option<Decision>,
  /// If set, a notification fan-out is detached after the audit append.
  pub event:    Option<LoanEvent>,
  /// Caller-supplied effective time (e.g. a back-dated disbursement);
  /// defaults to now.
  pub at:       Option<DateTime<Utc>>,
}

impl Edge {
  pub(crate) fn to(target: LoanStatus) -> Self {
    Self { target, notes: None, decision: None, event: None, at: None }
  }
}

// ─── The routine ─────────────────────────────────────────────────────────────

impl<S, L, D, N> LoanWorkflow<S, L, D, N>
where
  S: LoanStore + 'static,
  L: LedgerMirror + 'static,
  D: Directory + 'static,
  N: Notifier + 'static,
{
  pub(crate) async fn change_status(
    &self,
    actor: &Actor,
    loan: &Loan,
    edge: Edge,
  ) -> Result<TransitionReceipt> {
    let from = loan.status;
    if !policy::can_transition(from, edge.target, actor.role) {
      return Err(Error::denied_edge(from, edge.target, actor.role));
    }

    let at = edge.at.unwrap_or_else(Utc::now);
    let approval = edge.decision.map(|decision| Approval {
      decision,
      reviewed_by: actor.user_id,
      reviewed_at: at,
      notes: edge.notes.clone(),
      previous_status: from,
      new_status: edge.target,
    });

    let write = StatusWrite {
      expected: from,
      target: edge.target,
      performed_by: actor.user_id,
      at,
      approval,
    };

    // Relational mirror first; its failure never blocks the transition.
    if let Err(e) = self
      .ledger
      .mirror_transition(loan.agency_id, loan.loan_id, &write)
      .await
    {
      tracing::warn!(
        loan = %loan.loan_id,
        error = %e,
        "ledger mirror write failed; continuing"
      );
    }

    // The primary document write decides the outcome. It is conditional on
    // the loan still holding the status the permission check saw.
    let updated = match self
      .store
      .apply_transition(loan.agency_id, loan.loan_id, write.clone())
      .await
      .map_err(Error::store)?
    {
      TransitionOutcome::Applied(updated) => updated,
      TransitionOutcome::Conflict { actual } => {
        return Err(Error::Conflict {
          loan_id: loan.loan_id,
          expected: from,
          actual,
        });
      }
      TransitionOutcome::Missing => {
        return Err(Error::LoanNotFound(loan.loan_id));
      }
    };

    // Loan-scoped audit is the primary compliance record — a hard failure.
    let entry = self
      .store
      .append_loan_audit(NewAuditEntry {
        loan_id:           loan.loan_id,
        agency_id:         loan.agency_id,
        action:            AuditAction::StatusChange,
        previous_status:   Some(from),
        new_status:        edge.target,
        performed_by:      actor.user_id,
        performed_by_role: actor.role,
        notes:             edge.notes,
        approval:          write.approval,
      })
      .await
      .map_err(Error::store)?;

    // The agency rollup copy is best-effort.
    if let Err(e) = self.store.append_agency_audit(&entry).await {
      tracing::warn!(
        agency = %loan.agency_id,
        error = %e,
        "agency audit append failed"
      );
    }

    // Detached fan-out: the task's outcome is logged inside it and never
    // joined into this call's result.
    if let Some(event) = edge.event {
      let directory = Arc::clone(&self.directory);
      let notifier = Arc::clone(&self.notifier);
      let snapshot = updated.clone();
      tokio::spawn(async move {
        notify::dispatch_event(
          directory.as_ref(),
          notifier.as_ref(),
          event,
          &snapshot,
          notify::RECIPIENT_LOOKUP_TIMEOUT,
        )
        .await;
      });
    }

    Ok(TransitionReceipt { loan: updated, previous: from })
  }
}

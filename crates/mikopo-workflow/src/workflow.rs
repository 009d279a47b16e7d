//! Public workflow entry points: submit, approve, reject, disburse, close.
//!
//! Composite operations are modelled as sequences of atomic edges through
//! [`LoanWorkflow::change_status`] rather than special-cased inline: approve
//! and reject from `Pending` pass through `UnderReview` as their own audited
//! step, and disbursement triggers an auto-activation edge in the same call.

use chrono::{DateTime, Utc};
use mikopo_core::{
  actor::Actor,
  loan::{Decision, Loan, LoanStatus},
  notification::LoanEvent,
  policy::{self, LoanAction},
  store::{Directory, LedgerMirror, LoanStore, Notifier},
};
use uuid::Uuid;

use crate::{Error, LoanWorkflow, Result, TransitionReceipt, transition::Edge};

impl<S, L, D, N> LoanWorkflow<S, L, D, N>
where
  S: LoanStore + 'static,
  L: LedgerMirror + 'static,
  D: Directory + 'static,
  N: Notifier + 'static,
{
  // ── Helpers ───────────────────────────────────────────────────────────────

  async fn load(&self, agency_id: Uuid, loan_id: Uuid) -> Result<Loan> {
    self
      .store
      .get_loan(agency_id, loan_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::LoanNotFound(loan_id))
  }

  /// Gate an action on (role, state, ownership) before any side effect.
  fn authorize(action: LoanAction, loan: &Loan, actor: &Actor) -> Result<()> {
    let is_owner =
      loan.officer_id == actor.user_id || loan.created_by == actor.user_id;
    if policy::can_perform(action, actor.role, loan.status, is_owner) {
      Ok(())
    } else {
      Err(Error::denied_action(action, actor.role, loan.status))
    }
  }

  // ── Entry points ──────────────────────────────────────────────────────────

  /// `Draft → Pending`, by the loan's owner or an admin/manager.
  pub async fn submit_for_review(
    &self,
    agency_id: Uuid,
    loan_id: Uuid,
    actor: &Actor,
  ) -> Result<TransitionReceipt> {
    let loan = self.load(agency_id, loan_id).await?;
    Self::authorize(LoanAction::Submit, &loan, actor)?;

    let mut edge = Edge::to(LoanStatus::Pending);
    edge.event = Some(LoanEvent::Submitted);
    self.change_status(actor, &loan, edge).await
  }

  /// Approve a loan in `Pending` or `UnderReview`. A pending loan first
  /// passes through review intake as its own audited step.
  pub async fn approve(
    &self,
    agency_id: Uuid,
    loan_id: Uuid,
    actor: &Actor,
    notes: Option<String>,
  ) -> Result<TransitionReceipt> {
    self.review(agency_id, loan_id, actor, notes, Decision::Approved).await
  }

  /// Symmetric to [`Self::approve`], targeting `Rejected`.
  pub async fn reject(
    &self,
    agency_id: Uuid,
    loan_id: Uuid,
    actor: &Actor,
    notes: Option<String>,
  ) -> Result<TransitionReceipt> {
    self.review(agency_id, loan_id, actor, notes, Decision::Rejected).await
  }

  async fn review(
    &self,
    agency_id: Uuid,
    loan_id: Uuid,
    actor: &Actor,
    notes: Option<String>,
    decision: Decision,
  ) -> Result<TransitionReceipt> {
    let loan = self.load(agency_id, loan_id).await?;
    let action = match decision {
      Decision::Approved => LoanAction::Approve,
      Decision::Rejected => LoanAction::Reject,
    };
    Self::authorize(action, &loan, actor)?;

    // The intermediate edge is audited on its own and sends no notification.
    // If it fails, the decision edge is never attempted.
    let loan = if loan.status == LoanStatus::Pending {
      self
        .change_status(actor, &loan, Edge::to(LoanStatus::UnderReview))
        .await?
        .loan
    } else {
      loan
    };

    let (target, event) = match decision {
      Decision::Approved => (LoanStatus::Approved, LoanEvent::Approved),
      Decision::Rejected => (LoanStatus::Rejected, LoanEvent::Rejected),
    };
    let mut edge = Edge::to(target);
    edge.notes = notes;
    edge.decision = Some(decision);
    edge.event = Some(event);
    self.change_status(actor, &loan, edge).await
  }

  /// `Approved → Disbursed`, then an unconditional auto-activation edge
  /// (`Disbursed → Active`) by the same actor in the same call. The caller
  /// receives the disburse receipt; an activation failure is logged only.
  pub async fn disburse(
    &self,
    agency_id: Uuid,
    loan_id: Uuid,
    actor: &Actor,
    disbursed_at: Option<DateTime<Utc>>,
  ) -> Result<TransitionReceipt> {
    let loan = self.load(agency_id, loan_id).await?;
    Self::authorize(LoanAction::Disburse, &loan, actor)?;

    let mut edge = Edge::to(LoanStatus::Disbursed);
    edge.event = Some(LoanEvent::Disbursed);
    edge.at = disbursed_at;
    let receipt = self.change_status(actor, &loan, edge).await?;

    if let Err(e) = self
      .change_status(actor, &receipt.loan, Edge::to(LoanStatus::Active))
      .await
    {
      tracing::error!(
        loan = %loan_id,
        error = %e,
        "auto-activation after disbursement failed"
      );
    }

    Ok(receipt)
  }

  /// `Active → Closed` — successful completion.
  pub async fn close(
    &self,
    agency_id: Uuid,
    loan_id: Uuid,
    actor: &Actor,
    notes: Option<String>,
  ) -> Result<TransitionReceipt> {
    let loan = self.load(agency_id, loan_id).await?;
    Self::authorize(LoanAction::Close, &loan, actor)?;

    let mut edge = Edge::to(LoanStatus::Closed);
    edge.notes = notes;
    self.change_status(actor, &loan, edge).await
  }
}

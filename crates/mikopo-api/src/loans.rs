//! Handlers for `/agencies/:id/loans` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/agencies/:id/loans` | Optional `?status=<status>` |
//! | `POST` | `/agencies/:id/loans` | Draft intake; returns 201 + loan |
//! | `GET`  | `/agencies/:id/loans/:loan_id` | 404 if not found |
//! | `POST` | `.../submit` `.../approve` `.../reject` `.../disburse` `.../close` | Lifecycle transitions |
//! | `GET`  | `.../audit` | The loan's audit trail |
//!
//! Transition bodies carry the acting user inline; denial maps to 403 and a
//! concurrent modification to 409.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use mikopo_core::{
  actor::{Actor, Role},
  audit::AuditEntry,
  loan::{Loan, LoanStatus, NewLoan},
  store::{Directory, LedgerMirror, LoanStore, Notifier},
};
use mikopo_workflow::TransitionReceipt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

// ─── Bodies & responses ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub officer_id:      Uuid,
  pub created_by:      Uuid,
  pub created_by_role: Role,
  pub amount_minor:    i64,
}

/// The acting user, sent inline with every transition request.
#[derive(Debug, Deserialize)]
pub struct ActorBody {
  pub user_id: Uuid,
  pub role:    Role,
  /// Free-form note; recorded on the audit entry for the decision edge.
  pub notes:   Option<String>,
}

impl ActorBody {
  fn actor(&self) -> Actor {
    Actor { user_id: self.user_id, role: self.role }
  }
}

#[derive(Debug, Deserialize)]
pub struct DisburseBody {
  pub user_id:      Uuid,
  pub role:         Role,
  /// Effective disbursement time; defaults to now.
  pub disbursed_at: Option<DateTime<Utc>>,
}

/// A committed transition as returned to the caller.
#[derive(Debug, Serialize)]
pub struct TransitionResponse {
  pub loan:     Loan,
  pub previous: LoanStatus,
}

impl From<TransitionReceipt> for TransitionResponse {
  fn from(r: TransitionReceipt) -> Self {
    Self { loan: r.loan, previous: r.previous }
  }
}

// ─── CRUD ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub status: Option<LoanStatus>,
}

/// `GET /agencies/:id/loans[?status=<status>]`
pub async fn list<S, L>(
  State(state): State<AppState<S, L>>,
  Path(agency_id): Path<Uuid>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Loan>>, ApiError>
where
  S: LoanStore + Directory + Notifier + 'static,
  L: LedgerMirror + 'static,
{
  let loans = state
    .store
    .list_loans(agency_id, params.status)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(loans))
}

/// `POST /agencies/:id/loans`
pub async fn create<S, L>(
  State(state): State<AppState<S, L>>,
  Path(agency_id): Path<Uuid>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LoanStore + Directory + Notifier + 'static,
  L: LedgerMirror + 'static,
{
  if body.amount_minor <= 0 {
    return Err(ApiError::BadRequest(
      "amount_minor must be positive".into(),
    ));
  }

  let loan = state
    .store
    .add_loan(NewLoan {
      agency_id,
      officer_id: body.officer_id,
      created_by: body.created_by,
      created_by_role: body.created_by_role,
      amount_minor: body.amount_minor,
    })
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(loan)))
}

/// `GET /agencies/:id/loans/:loan_id`
pub async fn get_one<S, L>(
  State(state): State<AppState<S, L>>,
  Path((agency_id, loan_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Loan>, ApiError>
where
  S: LoanStore + Directory + Notifier + 'static,
  L: LedgerMirror + 'static,
{
  let loan = state
    .store
    .get_loan(agency_id, loan_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("loan {loan_id} not found")))?;
  Ok(Json(loan))
}

// ─── Transitions ─────────────────────────────────────────────────────────────

/// `POST /agencies/:id/loans/:loan_id/submit`
pub async fn submit<S, L>(
  State(state): State<AppState<S, L>>,
  Path((agency_id, loan_id)): Path<(Uuid, Uuid)>,
  Json(body): Json<ActorBody>,
) -> Result<Json<TransitionResponse>, ApiError>
where
  S: LoanStore + Directory + Notifier + 'static,
  L: LedgerMirror + 'static,
{
  let receipt = state
    .workflow
    .submit_for_review(agency_id, loan_id, &body.actor())
    .await?;
  Ok(Json(receipt.into()))
}

/// `POST /agencies/:id/loans/:loan_id/approve`
pub async fn approve<S, L>(
  State(state): State<AppState<S, L>>,
  Path((agency_id, loan_id)): Path<(Uuid, Uuid)>,
  Json(body): Json<ActorBody>,
) -> Result<Json<TransitionResponse>, ApiError>
where
  S: LoanStore + Directory + Notifier + 'static,
  L: LedgerMirror + 'static,
{
  let receipt = state
    .workflow
    .approve(agency_id, loan_id, &body.actor(), body.notes.clone())
    .await?;
  Ok(Json(receipt.into()))
}

/// `POST /agencies/:id/loans/:loan_id/reject`
pub async fn reject<S, L>(
  State(state): State<AppState<S, L>>,
  Path((agency_id, loan_id)): Path<(Uuid, Uuid)>,
  Json(body): Json<ActorBody>,
) -> Result<Json<TransitionResponse>, ApiError>
where
  S: LoanStore + Directory + Notifier + 'static,
  L: LedgerMirror + 'static,
{
  let receipt = state
    .workflow
    .reject(agency_id, loan_id, &body.actor(), body.notes.clone())
    .await?;
  Ok(Json(receipt.into()))
}

/// `POST /agencies/:id/loans/:loan_id/disburse`
pub async fn disburse<S, L>(
  State(state): State<AppState<S, L>>,
  Path((agency_id, loan_id)): Path<(Uuid, Uuid)>,
  Json(body): Json<DisburseBody>,
) -> Result<Json<TransitionResponse>, ApiError>
where
  S: LoanStore + Directory + Notifier + 'static,
  L: LedgerMirror + 'static,
{
  let actor = Actor { user_id: body.user_id, role: body.role };
  let receipt = state
    .workflow
    .disburse(agency_id, loan_id, &actor, body.disbursed_at)
    .await?;
  Ok(Json(receipt.into()))
}

/// `POST /agencies/:id/loans/:loan_id/close`
pub async fn close<S, L>(
  State(state): State<AppState<S, L>>,
  Path((agency_id, loan_id)): Path<(Uuid, Uuid)>,
  Json(body): Json<ActorBody>,
) -> Result<Json<TransitionResponse>, ApiError>
where
  S: LoanStore + Directory + Notifier + 'static,
  L: LedgerMirror + 'static,
{
  let receipt = state
    .workflow
    .close(agency_id, loan_id, &body.actor(), body.notes.clone())
    .await?;
  Ok(Json(receipt.into()))
}

// ─── Audit ───────────────────────────────────────────────────────────────────

/// `GET /agencies/:id/loans/:loan_id/audit`
pub async fn audit<S, L>(
  State(state): State<AppState<S, L>>,
  Path((agency_id, loan_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Vec<AuditEntry>>, ApiError>
where
  S: LoanStore + Directory + Notifier + 'static,
  L: LedgerMirror + 'static,
{
  let entries = state
    .store
    .list_loan_audit(agency_id, loan_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(entries))
}

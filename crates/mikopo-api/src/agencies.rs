//! Handlers for `/agencies` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/agencies` | Body: `{"name":"...","plan":"paid"}` |
//! | `GET`  | `/agencies/:id` | 404 if not found |
//! | `POST` | `/agencies/:id/members` | Idempotent; re-adding updates the role |
//! | `GET`  | `/agencies/:id/audit` | The agency-wide rollup stream |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use mikopo_core::{
  actor::Role,
  agency::{Agency, Member, PlanType},
  audit::AuditEntry,
  store::{Directory, LedgerMirror, LoanStore, Notifier},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub name: String,
  pub plan: PlanType,
}

/// `POST /agencies` — body: `{"name":"...","plan":"free|paid|enterprise"}`
pub async fn create<S, L>(
  State(state): State<AppState<S, L>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LoanStore + Directory + Notifier + 'static,
  L: LedgerMirror + 'static,
{
  let agency = state
    .store
    .add_agency(body.name, body.plan)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(agency)))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /agencies/:id`
pub async fn get_one<S, L>(
  State(state): State<AppState<S, L>>,
  Path(agency_id): Path<Uuid>,
) -> Result<Json<Agency>, ApiError>
where
  S: LoanStore + Directory + Notifier + 'static,
  L: LedgerMirror + 'static,
{
  let agency = state
    .store
    .get_agency(agency_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!("agency {agency_id} not found"))
    })?;
  Ok(Json(agency))
}

// ─── Members ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MemberBody {
  pub user_id: Uuid,
  pub role:    Role,
}

/// `POST /agencies/:id/members` — body: `{"user_id":"...","role":"manager"}`
pub async fn add_member<S, L>(
  State(state): State<AppState<S, L>>,
  Path(agency_id): Path<Uuid>,
  Json(body): Json<MemberBody>,
) -> Result<(StatusCode, Json<Member>), ApiError>
where
  S: LoanStore + Directory + Notifier + 'static,
  L: LedgerMirror + 'static,
{
  let member = state
    .store
    .add_member(agency_id, body.user_id, body.role)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(member)))
}

// ─── Audit rollup ────────────────────────────────────────────────────────────

/// `GET /agencies/:id/audit`
pub async fn audit<S, L>(
  State(state): State<AppState<S, L>>,
  Path(agency_id): Path<Uuid>,
) -> Result<Json<Vec<AuditEntry>>, ApiError>
where
  S: LoanStore + Directory + Notifier + 'static,
  L: LedgerMirror + 'static,
{
  let entries = state
    .store
    .list_agency_audit(agency_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(entries))
}

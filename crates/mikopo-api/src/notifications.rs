//! Handler for a user's notification inbox.

use axum::{
  Json,
  extract::{Path, State},
};
use mikopo_core::{
  notification::Notification,
  store::{Directory, LedgerMirror, LoanStore, Notifier},
};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// `GET /users/:id/notifications` — newest first.
pub async fn list<S, L>(
  State(state): State<AppState<S, L>>,
  Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<Notification>>, ApiError>
where
  S: LoanStore + Directory + Notifier + 'static,
  L: LedgerMirror + 'static,
{
  let inbox = state
    .store
    .list_for_user(user_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(inbox))
}

//! Handler for the entitlement gate.
//!
//! A read-only, UI-level check: `GET /agencies/:id/features/:feature` reports
//! whether the agency's plan unlocks the feature right now. Nothing in the
//! loan workflow consults this.

use axum::{
  Json,
  extract::{Path, State},
};
use chrono::Utc;
use mikopo_core::{
  entitlement::{self, Feature},
  store::{Directory, LedgerMirror, LoanStore, Notifier},
};
use serde::Serialize;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

#[derive(Debug, Serialize)]
pub struct FeatureResponse {
  pub feature:      Feature,
  pub enabled:      bool,
  /// Whether the date-boxed launch promotion is what enabled it.
  pub promo_active: bool,
}

/// `GET /agencies/:id/features/:feature`
pub async fn check<S, L>(
  State(state): State<AppState<S, L>>,
  Path((agency_id, feature)): Path<(Uuid, Feature)>,
) -> Result<Json<FeatureResponse>, ApiError>
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

  let now = Utc::now();
  let cutoff = entitlement::launch_promo_cutoff();
  Ok(Json(FeatureResponse {
    feature,
    enabled: entitlement::has_feature(agency.plan, feature, now, cutoff),
    promo_active: entitlement::promo_active(now, cutoff),
  }))
}

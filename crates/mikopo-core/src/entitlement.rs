//! The entitlement gate — feature availability from subscription plan.
//!
//! A UI-level check, not a security boundary: the workflow never consults it.
//! All functions here are pure; the current time is always an explicit
//! argument so callers (and tests) control the clock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::agency::PlanType;

/// Plan-gated features of the product.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display,
  EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Feature {
  AdvancedReports,
  BulkExport,
  Marketplace,
  ApiAccess,
}

/// End of the launch promotion, during which every feature is enabled for
/// every plan: 2026-01-01T00:00:00Z.
pub fn launch_promo_cutoff() -> DateTime<Utc> {
  DateTime::from_timestamp(1_767_225_600, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Whether the date-boxed global override is in effect at `now`.
pub fn promo_active(now: DateTime<Utc>, cutoff: DateTime<Utc>) -> bool {
  now < cutoff
}

/// The per-plan feature whitelist, ignoring the promotion.
pub fn plan_has_feature(plan: PlanType, feature: Feature) -> bool {
  match plan {
    PlanType::Enterprise => true,
    PlanType::Paid => matches!(
      feature,
      Feature::AdvancedReports | Feature::BulkExport | Feature::Marketplace
    ),
    PlanType::Free => false,
  }
}

/// Whether `feature` is available to `plan` at `now`. The promotion takes
/// precedence over the plan whitelist.
pub fn has_feature(
  plan: PlanType,
  feature: Feature,
  now: DateTime<Utc>,
  cutoff: DateTime<Utc>,
) -> bool {
  promo_active(now, cutoff) || plan_has_feature(plan, feature)
}

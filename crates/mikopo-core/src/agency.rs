//! Agencies (tenants) and their members.
//!
//! Every store read and write is scoped by `agency_id`; nothing in the
//! workflow crosses tenant boundaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::actor::Role;

/// Subscription tier of an agency; read-only from the workflow's perspective.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PlanType {
  Free,
  Paid,
  Enterprise,
}

/// A tenant — a microfinance institution owning its own loans and staff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agency {
  pub agency_id:  Uuid,
  pub name:       String,
  pub plan:       PlanType,
  pub created_at: DateTime<Utc>,
}

/// A user's membership in an agency, carrying their role there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
  pub user_id:    Uuid,
  pub agency_id:  Uuid,
  pub role:       Role,
  pub created_at: DateTime<Utc>,
}

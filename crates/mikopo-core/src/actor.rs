//! Actors — who is asking for a transition.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use uuid::Uuid;

/// A role held by a user within an agency.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display,
  EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
  Admin,
  Manager,
  /// Review authority without full management rights.
  Underwriter,
  LoanOfficer,
  Accountant,
  Customer,
}

impl Role {
  /// Roles allowed to approve or reject a loan under review.
  pub fn has_review_authority(&self) -> bool {
    matches!(self, Self::Admin | Self::Manager | Self::Underwriter)
  }

  /// Roles allowed to disburse an approved loan.
  pub fn can_disburse(&self) -> bool {
    matches!(self, Self::Admin | Self::Accountant)
  }
}

/// The identity a workflow entry point acts on behalf of.
///
/// Authentication is the caller's concern; the workflow trusts this pair and
/// only evaluates it against the permission matrix.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Actor {
  pub user_id: Uuid,
  pub role:    Role,
}

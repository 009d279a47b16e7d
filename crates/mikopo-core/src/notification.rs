//! Notification types.
//!
//! Notifications are a best-effort channel, not a compliance record — that is
//! the audit log's job. Delivery failures are logged and swallowed by the
//! dispatcher; nothing downstream depends on a notification having arrived.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// The transition events that fan out to interested actors.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LoanEvent {
  Submitted,
  Approved,
  Rejected,
  Disbursed,
}

/// A delivered message in a user's inbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
  pub notification_id: Uuid,
  pub recipient_id:    Uuid,
  pub agency_id:       Uuid,
  pub loan_id:         Uuid,
  pub event:           LoanEvent,
  pub title:           String,
  pub message:         String,
  pub link:            Option<String>,
  pub sent_at:         DateTime<Utc>,
}

/// Input to [`crate::store::Notifier::send`]. The id and `sent_at` are set by
/// the delivery channel.
#[derive(Debug, Clone)]
pub struct NewNotification {
  pub recipient_id: Uuid,
  pub agency_id:    Uuid,
  pub loan_id:      Uuid,
  pub event:        LoanEvent,
  pub title:        String,
  pub message:      String,
  pub link:         Option<String>,
}

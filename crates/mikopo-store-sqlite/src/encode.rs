//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Loans and approval records
//! are stored as compact JSON. Enum discriminants use their snake_case string
//! forms. UUIDs are stored as hyphenated lowercase strings.

use std::str::FromStr as _;

use chrono::{DateTime, Utc};
use mikopo_core::{
  actor::Role,
  agency::{Agency, PlanType},
  audit::{AuditAction, AuditEntry},
  loan::{Approval, Loan, LoanStatus},
  notification::{LoanEvent, Notification},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enum discriminants ──────────────────────────────────────────────────────

pub fn encode_status(s: LoanStatus) -> String { s.to_string() }

pub fn decode_status(s: &str) -> Result<LoanStatus> {
  LoanStatus::from_str(s)
    .map_err(|_| mikopo_core::Error::UnknownStatus(s.to_owned()).into())
}

pub fn encode_role(r: Role) -> String { r.to_string() }

pub fn decode_role(s: &str) -> Result<Role> {
  Role::from_str(s)
    .map_err(|_| mikopo_core::Error::UnknownRole(s.to_owned()).into())
}

pub fn encode_plan(p: PlanType) -> String { p.to_string() }

pub fn decode_plan(s: &str) -> Result<PlanType> {
  PlanType::from_str(s)
    .map_err(|_| Error::DateParse(format!("unknown plan: {s:?}")))
}

pub fn encode_action(a: AuditAction) -> String { a.to_string() }

pub fn decode_action(s: &str) -> Result<AuditAction> {
  AuditAction::from_str(s)
    .map_err(|_| Error::DateParse(format!("unknown audit action: {s:?}")))
}

pub fn encode_event(e: LoanEvent) -> String { e.to_string() }

pub fn decode_event(s: &str) -> Result<LoanEvent> {
  LoanEvent::from_str(s)
    .map_err(|_| Error::DateParse(format!("unknown loan event: {s:?}")))
}

// ─── JSON payloads ───────────────────────────────────────────────────────────

pub fn encode_loan_doc(loan: &Loan) -> Result<String> {
  Ok(serde_json::to_string(loan)?)
}

pub fn decode_loan_doc(s: &str) -> Result<Loan> {
  Ok(serde_json::from_str(s)?)
}

pub fn encode_approval(a: &Approval) -> Result<String> {
  Ok(serde_json::to_string(a)?)
}

pub fn decode_approval(s: &str) -> Result<Approval> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from an `agencies` row.
pub struct RawAgency {
  pub agency_id:  String,
  pub name:       String,
  pub plan:       String,
  pub created_at: String,
}

impl RawAgency {
  pub fn into_agency(self) -> Result<Agency> {
    Ok(Agency {
      agency_id:  decode_uuid(&self.agency_id)?,
      name:       self.name,
      plan:       decode_plan(&self.plan)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `loan_audit` or `agency_audit` row.
pub struct RawAuditEntry {
  pub entry_id:          String,
  pub loan_id:           String,
  pub agency_id:         String,
  pub action:            String,
  pub previous_status:   Option<String>,
  pub new_status:        String,
  pub performed_by:      String,
  pub performed_by_role: String,
  pub at:                String,
  pub notes:             Option<String>,
  pub approval_json:     Option<String>,
}

impl RawAuditEntry {
  pub fn into_entry(self) -> Result<AuditEntry> {
    Ok(AuditEntry {
      entry_id:          decode_uuid(&self.entry_id)?,
      loan_id:           decode_uuid(&self.loan_id)?,
      agency_id:         decode_uuid(&self.agency_id)?,
      action:            decode_action(&self.action)?,
      previous_status:   self
        .previous_status
        .as_deref()
        .map(decode_status)
        .transpose()?,
      new_status:        decode_status(&self.new_status)?,
      performed_by:      decode_uuid(&self.performed_by)?,
      performed_by_role: decode_role(&self.performed_by_role)?,
      at:                decode_dt(&self.at)?,
      notes:             self.notes,
      approval:          self
        .approval_json
        .as_deref()
        .map(decode_approval)
        .transpose()?,
    })
  }
}

/// Raw strings read directly from a `notifications` row.
pub struct RawNotification {
  pub notification_id: String,
  pub recipient_id:    String,
  pub agency_id:       String,
  pub loan_id:         String,
  pub event:           String,
  pub title:           String,
  pub message:         String,
  pub link:            Option<String>,
  pub sent_at:         String,
}

impl RawNotification {
  pub fn into_notification(self) -> Result<Notification> {
    Ok(Notification {
      notification_id: decode_uuid(&self.notification_id)?,
      recipient_id:    decode_uuid(&self.recipient_id)?,
      agency_id:       decode_uuid(&self.agency_id)?,
      loan_id:         decode_uuid(&self.loan_id)?,
      event:           decode_event(&self.event)?,
      title:           self.title,
      message:         self.message,
      link:            self.link,
      sent_at:         decode_dt(&self.sent_at)?,
    })
  }
}

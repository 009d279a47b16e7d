//! [`SqliteStore`] — the SQLite implementation of the primary store traits.
//!
//! One database file backs [`LoanStore`], [`Directory`], and [`Notifier`];
//! the same handle is shared by the workflow for all three concerns.

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use mikopo_core::{
  actor::Role,
  agency::{Agency, Member, PlanType},
  audit::{AuditAction, AuditEntry, NewAuditEntry},
  loan::{Loan, LoanStatus, NewLoan, StatusWrite},
  notification::{NewNotification, Notification},
  store::{Directory, LoanStore, Notifier, TransitionOutcome},
};

use crate::{
  Error, Result,
  encode::{
    RawAgency, RawAuditEntry, RawNotification, decode_loan_doc,
    decode_status, decode_uuid, encode_action, encode_approval, encode_dt,
    encode_event, encode_loan_doc, encode_plan, encode_role, encode_status,
    encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// The Mikopo primary store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// What the conditional status UPDATE reported, before decoding.
enum RawApply {
  Applied,
  Changed(String),
  Gone,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Fetch a loan's raw document, scoped by agency.
  async fn fetch_doc(
    &self,
    agency_id: Uuid,
    loan_id: Uuid,
  ) -> Result<Option<String>> {
    let agency_str = encode_uuid(agency_id);
    let loan_str = encode_uuid(loan_id);

    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT doc FROM loans WHERE loan_id = ?1 AND agency_id = ?2",
                rusqlite::params![loan_str, agency_str],
                |row| row.get(0),
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  /// Append one audit row. Both audit tables share the same column set.
  async fn insert_audit(
    &self,
    table: &'static str,
    entry: &AuditEntry,
  ) -> Result<()> {
    let entry_id_str  = encode_uuid(entry.entry_id);
    let loan_id_str   = encode_uuid(entry.loan_id);
    let agency_id_str = encode_uuid(entry.agency_id);
    let action_str    = encode_action(entry.action);
    let previous_str  = entry.previous_status.map(encode_status);
    let new_str       = encode_status(entry.new_status);
    let by_str        = encode_uuid(entry.performed_by);
    let role_str      = encode_role(entry.performed_by_role);
    let at_str        = encode_dt(entry.at);
    let notes         = entry.notes.clone();
    let approval_str  =
      entry.approval.as_ref().map(encode_approval).transpose()?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO {table} (
               entry_id, loan_id, agency_id, action,
               previous_status, new_status,
               performed_by, performed_by_role, at, notes, approval_json
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
          ),
          rusqlite::params![
            entry_id_str,
            loan_id_str,
            agency_id_str,
            action_str,
            previous_str,
            new_str,
            by_str,
            role_str,
            at_str,
            notes,
            approval_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list_audit(
    &self,
    table: &'static str,
    filters: &[(&'static str, Uuid)],
  ) -> Result<Vec<AuditEntry>> {
    let clause = filters
      .iter()
      .enumerate()
      .map(|(i, (column, _))| format!("{column} = ?{}", i + 1))
      .collect::<Vec<_>>()
      .join(" AND ");
    let params: Vec<String> =
      filters.iter().map(|(_, id)| encode_uuid(*id)).collect();

    let raws: Vec<RawAuditEntry> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT entry_id, loan_id, agency_id, action,
                  previous_status, new_status,
                  performed_by, performed_by_role, at, notes, approval_json
           FROM {table} WHERE {clause}
           ORDER BY at, rowid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), |row| {
            Ok(RawAuditEntry {
              entry_id:          row.get(0)?,
              loan_id:           row.get(1)?,
              agency_id:         row.get(2)?,
              action:            row.get(3)?,
              previous_status:   row.get(4)?,
              new_status:        row.get(5)?,
              performed_by:      row.get(6)?,
              performed_by_role: row.get(7)?,
              at:                row.get(8)?,
              notes:             row.get(9)?,
              approval_json:     row.get(10)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAuditEntry::into_entry).collect()
  }
}

// ─── LoanStore impl ──────────────────────────────────────────────────────────

impl LoanStore for SqliteStore {
  type Error = Error;

  // ── Agencies & members ────────────────────────────────────────────────────

  async fn add_agency(&self, name: String, plan: PlanType) -> Result<Agency> {
    let agency = Agency {
      agency_id: Uuid::new_v4(),
      name,
      plan,
      created_at: Utc::now(),
    };

    let id_str   = encode_uuid(agency.agency_id);
    let name_str = agency.name.clone();
    let plan_str = encode_plan(plan);
    let at_str   = encode_dt(agency.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO agencies (agency_id, name, plan, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, name_str, plan_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(agency)
  }

  async fn get_agency(&self, agency_id: Uuid) -> Result<Option<Agency>> {
    let id_str = encode_uuid(agency_id);

    let raw: Option<RawAgency> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT agency_id, name, plan, created_at
               FROM agencies WHERE agency_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawAgency {
                  agency_id:  row.get(0)?,
                  name:       row.get(1)?,
                  plan:       row.get(2)?,
                  created_at: row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAgency::into_agency).transpose()
  }

  async fn add_member(
    &self,
    agency_id: Uuid,
    user_id: Uuid,
    role: Role,
  ) -> Result<Member> {
    if self.get_agency(agency_id).await?.is_none() {
      return Err(Error::AgencyNotFound(agency_id));
    }

    let member = Member { user_id, agency_id, role, created_at: Utc::now() };

    let user_str   = encode_uuid(user_id);
    let agency_str = encode_uuid(agency_id);
    let role_str   = encode_role(role);
    let at_str     = encode_dt(member.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO members (user_id, agency_id, role, created_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (user_id, agency_id) DO UPDATE SET role = excluded.role",
          rusqlite::params![user_str, agency_str, role_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(member)
  }

  // ── Loans ─────────────────────────────────────────────────────────────────

  async fn add_loan(&self, input: NewLoan) -> Result<Loan> {
    if self.get_agency(input.agency_id).await?.is_none() {
      return Err(Error::AgencyNotFound(input.agency_id));
    }

    let loan = Loan {
      loan_id:      Uuid::new_v4(),
      agency_id:    input.agency_id,
      status:       LoanStatus::Draft,
      amount_minor: input.amount_minor,
      officer_id:   input.officer_id,
      created_by:   input.created_by,
      created_at:   Utc::now(),
      approval:     None,
      disbursed_at: None,
      disbursed_by: None,
      closed_at:    None,
      closed_by:    None,
    };

    let loan_str   = encode_uuid(loan.loan_id);
    let agency_str = encode_uuid(loan.agency_id);
    let status_str = encode_status(loan.status);
    let doc        = encode_loan_doc(&loan)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO loans (loan_id, agency_id, status, doc)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![loan_str, agency_str, status_str, doc],
        )?;
        Ok(())
      })
      .await?;

    // Draft intake gets its own audit entry.
    let entry = AuditEntry {
      entry_id:          Uuid::new_v4(),
      loan_id:           loan.loan_id,
      agency_id:         loan.agency_id,
      action:            AuditAction::Created,
      previous_status:   None,
      new_status:        LoanStatus::Draft,
      performed_by:      loan.created_by,
      performed_by_role: input.created_by_role,
      at:                loan.created_at,
      notes:             None,
      approval:          None,
    };
    self.insert_audit("loan_audit", &entry).await?;

    Ok(loan)
  }

  async fn get_loan(
    &self,
    agency_id: Uuid,
    loan_id: Uuid,
  ) -> Result<Option<Loan>> {
    self
      .fetch_doc(agency_id, loan_id)
      .await?
      .as_deref()
      .map(decode_loan_doc)
      .transpose()
  }

  async fn list_loans(
    &self,
    agency_id: Uuid,
    status: Option<LoanStatus>,
  ) -> Result<Vec<Loan>> {
    let agency_str = encode_uuid(agency_id);
    let status_str = status.map(encode_status);

    let docs: Vec<String> = self
      .conn
      .call(move |conn| {
        let rows = if let Some(s) = status_str {
          let mut stmt = conn.prepare(
            "SELECT doc FROM loans WHERE agency_id = ?1 AND status = ?2",
          )?;
          stmt
            .query_map(rusqlite::params![agency_str, s], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt =
            conn.prepare("SELECT doc FROM loans WHERE agency_id = ?1")?;
          stmt
            .query_map(rusqlite::params![agency_str], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    docs.iter().map(|d| decode_loan_doc(d)).collect()
  }

  async fn apply_transition(
    &self,
    agency_id: Uuid,
    loan_id: Uuid,
    write: StatusWrite,
  ) -> Result<TransitionOutcome> {
    let Some(doc) = self.fetch_doc(agency_id, loan_id).await? else {
      return Ok(TransitionOutcome::Missing);
    };
    let mut loan = decode_loan_doc(&doc)?;

    if loan.status != write.expected {
      return Ok(TransitionOutcome::Conflict { actual: loan.status });
    }

    // Only transitions mutate a loan document, and every transition changes
    // the status column, so the document read above stays valid as long as
    // the conditional UPDATE below still sees the expected status.
    loan.status = write.target;
    if let Some(approval) = write.approval {
      loan.approval = Some(approval);
    }
    match write.target {
      LoanStatus::Disbursed => {
        loan.disbursed_at = Some(write.at);
        loan.disbursed_by = Some(write.performed_by);
      }
      LoanStatus::Closed => {
        loan.closed_at = Some(write.at);
        loan.closed_by = Some(write.performed_by);
      }
      _ => {}
    }

    let loan_str     = encode_uuid(loan_id);
    let agency_str   = encode_uuid(agency_id);
    let expected_str = encode_status(write.expected);
    let target_str   = encode_status(write.target);
    let new_doc      = encode_loan_doc(&loan)?;

    let raw = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE loans SET status = ?1, doc = ?2
           WHERE loan_id = ?3 AND agency_id = ?4 AND status = ?5",
          rusqlite::params![
            target_str, new_doc, loan_str, agency_str, expected_str
          ],
        )?;
        if changed == 1 {
          return Ok(RawApply::Applied);
        }
        let actual: Option<String> = conn
          .query_row(
            "SELECT status FROM loans WHERE loan_id = ?1 AND agency_id = ?2",
            rusqlite::params![loan_str, agency_str],
            |row| row.get(0),
          )
          .optional()?;
        Ok(match actual {
          Some(s) => RawApply::Changed(s),
          None => RawApply::Gone,
        })
      })
      .await?;

    Ok(match raw {
      RawApply::Applied => TransitionOutcome::Applied(loan),
      RawApply::Changed(s) => {
        TransitionOutcome::Conflict { actual: decode_status(&s)? }
      }
      RawApply::Gone => TransitionOutcome::Missing,
    })
  }

  // ── Audit ─────────────────────────────────────────────────────────────────

  async fn append_loan_audit(&self, input: NewAuditEntry) -> Result<AuditEntry> {
    let entry = AuditEntry {
      entry_id:          Uuid::new_v4(),
      loan_id:           input.loan_id,
      agency_id:         input.agency_id,
      action:            input.action,
      previous_status:   input.previous_status,
      new_status:        input.new_status,
      performed_by:      input.performed_by,
      performed_by_role: input.performed_by_role,
      at:                Utc::now(),
      notes:             input.notes,
      approval:          input.approval,
    };
    self.insert_audit("loan_audit", &entry).await?;
    Ok(entry)
  }

  async fn append_agency_audit(&self, entry: &AuditEntry) -> Result<()> {
    self.insert_audit("agency_audit", entry).await
  }

  async fn list_loan_audit(
    &self,
    agency_id: Uuid,
    loan_id: Uuid,
  ) -> Result<Vec<AuditEntry>> {
    self
      .list_audit(
        "loan_audit",
        &[("agency_id", agency_id), ("loan_id", loan_id)],
      )
      .await
  }

  async fn list_agency_audit(&self, agency_id: Uuid) -> Result<Vec<AuditEntry>> {
    self.list_audit("agency_audit", &[("agency_id", agency_id)]).await
  }
}

// ─── Directory impl ──────────────────────────────────────────────────────────

impl Directory for SqliteStore {
  type Error = Error;

  async fn members_with_roles(
    &self,
    agency_id: Uuid,
    roles: &[Role],
  ) -> Result<Vec<Uuid>> {
    if roles.is_empty() {
      return Ok(Vec::new());
    }

    let agency_str = encode_uuid(agency_id);
    let role_strs: Vec<String> = roles.iter().copied().map(encode_role).collect();

    let ids: Vec<String> = self
      .conn
      .call(move |conn| {
        let placeholders = (0..role_strs.len())
          .map(|i| format!("?{}", i + 2))
          .collect::<Vec<_>>()
          .join(", ");
        let sql = format!(
          "SELECT user_id FROM members
           WHERE agency_id = ?1 AND role IN ({placeholders})"
        );

        let mut params: Vec<String> = vec![agency_str];
        params.extend(role_strs);

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    ids.iter().map(|s| decode_uuid(s)).collect()
  }
}

// ─── Notifier impl ───────────────────────────────────────────────────────────

impl Notifier for SqliteStore {
  type Error = Error;

  async fn send(&self, input: NewNotification) -> Result<Notification> {
    let notification = Notification {
      notification_id: Uuid::new_v4(),
      recipient_id:    input.recipient_id,
      agency_id:       input.agency_id,
      loan_id:         input.loan_id,
      event:           input.event,
      title:           input.title,
      message:         input.message,
      link:            input.link,
      sent_at:         Utc::now(),
    };

    let id_str        = encode_uuid(notification.notification_id);
    let recipient_str = encode_uuid(notification.recipient_id);
    let agency_str    = encode_uuid(notification.agency_id);
    let loan_str      = encode_uuid(notification.loan_id);
    let event_str     = encode_event(notification.event);
    let title         = notification.title.clone();
    let message       = notification.message.clone();
    let link          = notification.link.clone();
    let at_str        = encode_dt(notification.sent_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO notifications (
             notification_id, recipient_id, agency_id, loan_id,
             event, title, message, link, sent_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            id_str, recipient_str, agency_str, loan_str,
            event_str, title, message, link, at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(notification)
  }

  async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Notification>> {
    let user_str = encode_uuid(user_id);

    let raws: Vec<RawNotification> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT notification_id, recipient_id, agency_id, loan_id,
                  event, title, message, link, sent_at
           FROM notifications WHERE recipient_id = ?1
           ORDER BY sent_at DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![user_str], |row| {
            Ok(RawNotification {
              notification_id: row.get(0)?,
              recipient_id:    row.get(1)?,
              agency_id:       row.get(2)?,
              loan_id:         row.get(3)?,
              event:           row.get(4)?,
              title:           row.get(5)?,
              message:         row.get(6)?,
              link:            row.get(7)?,
              sent_at:         row.get(8)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawNotification::into_notification)
      .collect()
  }
}

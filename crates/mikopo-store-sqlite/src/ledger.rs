//! [`SqliteLedger`] — the relational mirror.
//!
//! A separate database from the primary store, holding one flat row per loan
//! for billing and reporting queries. Writes are upserts keyed by loan id;
//! the workflow treats a failure here as best-effort, so a row may briefly
//! lag (or, on a conflicted transition, lead) the primary until the next
//! mirrored write or an out-of-band reconciliation.

use std::path::Path;

use chrono::{DateTime, Utc};
use mikopo_core::{
  loan::{Decision, LoanStatus, StatusWrite},
  store::LedgerMirror,
};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    decode_dt, decode_status, decode_uuid, encode_dt, encode_status,
    encode_uuid,
  },
  schema::LEDGER_SCHEMA,
};

/// One row of the `ledger_loans` table.
#[derive(Debug, Clone)]
pub struct LedgerRow {
  pub loan_id:     Uuid,
  pub agency_id:   Uuid,
  pub status:      LoanStatus,
  pub approved_by: Option<Uuid>,
  pub updated_at:  DateTime<Utc>,
}

/// The ledger mirror backed by its own SQLite file.
#[derive(Clone)]
pub struct SqliteLedger {
  conn: tokio_rusqlite::Connection,
}

impl SqliteLedger {
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let ledger = Self { conn };
    ledger.init_schema().await?;
    Ok(ledger)
  }

  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let ledger = Self { conn };
    ledger.init_schema().await?;
    Ok(ledger)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(LEDGER_SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Read back a mirrored row; used by reporting and reconciliation.
  pub async fn row(&self, loan_id: Uuid) -> Result<Option<LedgerRow>> {
    let loan_str = encode_uuid(loan_id);

    let raw: Option<(String, String, String, Option<String>, String)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT loan_id, agency_id, status, approved_by, updated_at
               FROM ledger_loans WHERE loan_id = ?1",
              rusqlite::params![loan_str],
              |row| {
                Ok((
                  row.get(0)?,
                  row.get(1)?,
                  row.get(2)?,
                  row.get(3)?,
                  row.get(4)?,
                ))
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .map(|(loan_id, agency_id, status, approved_by, updated_at)| {
        Ok(LedgerRow {
          loan_id:     decode_uuid(&loan_id)?,
          agency_id:   decode_uuid(&agency_id)?,
          status:      decode_status(&status)?,
          approved_by: approved_by.as_deref().map(decode_uuid).transpose()?,
          updated_at:  decode_dt(&updated_at)?,
        })
      })
      .transpose()
  }
}

impl LedgerMirror for SqliteLedger {
  type Error = crate::Error;

  async fn mirror_transition(
    &self,
    agency_id: Uuid,
    loan_id: Uuid,
    write: &StatusWrite,
  ) -> Result<()> {
    let loan_str   = encode_uuid(loan_id);
    let agency_str = encode_uuid(agency_id);
    let status_str = encode_status(write.target);
    let at_str     = encode_dt(write.at);
    // Only a committed approval decision stamps the approver column.
    let approved_by_str = write
      .approval
      .as_ref()
      .filter(|a| a.decision == Decision::Approved)
      .map(|a| encode_uuid(a.reviewed_by));

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO ledger_loans
             (loan_id, agency_id, status, approved_by, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT (loan_id) DO UPDATE SET
             status      = excluded.status,
             approved_by = COALESCE(excluded.approved_by,
                                    ledger_loans.approved_by),
             updated_at  = excluded.updated_at",
          rusqlite::params![
            loan_str, agency_str, status_str, approved_by_str, at_str
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

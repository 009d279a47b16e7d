//! SQL schemas for the Mikopo SQLite databases.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number. The primary store and
//! the ledger mirror are separate database files with separate schemas.

/// Primary (document-side) schema; idempotent thanks to
/// `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS agencies (
    agency_id   TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    plan        TEXT NOT NULL,   -- 'free' | 'paid' | 'enterprise'
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS members (
    user_id     TEXT NOT NULL,
    agency_id   TEXT NOT NULL REFERENCES agencies(agency_id),
    role        TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    PRIMARY KEY (user_id, agency_id)
);

-- Loans are stored as whole JSON documents. The status column is extracted
-- so the conditional transition UPDATE and status-filtered listings can run
-- in SQL; the document is authoritative for everything else.
CREATE TABLE IF NOT EXISTS loans (
    loan_id     TEXT PRIMARY KEY,
    agency_id   TEXT NOT NULL REFERENCES agencies(agency_id),
    status      TEXT NOT NULL,
    doc         TEXT NOT NULL
);

-- Both audit tables are strictly append-only.
-- No UPDATE or DELETE is ever issued against them.
CREATE TABLE IF NOT EXISTS loan_audit (
    entry_id          TEXT PRIMARY KEY,
    loan_id           TEXT NOT NULL REFERENCES loans(loan_id),
    agency_id         TEXT NOT NULL REFERENCES agencies(agency_id),
    action            TEXT NOT NULL,   -- 'created' | 'status_change'
    previous_status   TEXT,
    new_status        TEXT NOT NULL,
    performed_by      TEXT NOT NULL,
    performed_by_role TEXT NOT NULL,
    at                TEXT NOT NULL,   -- ISO 8601 UTC; server-assigned
    notes             TEXT,
    approval_json     TEXT             -- review decision record, or NULL
);

-- Agency-wide rollup copies of committed loan_audit entries.
CREATE TABLE IF NOT EXISTS agency_audit (
    entry_id          TEXT PRIMARY KEY,
    loan_id           TEXT NOT NULL,
    agency_id         TEXT NOT NULL REFERENCES agencies(agency_id),
    action            TEXT NOT NULL,
    previous_status   TEXT,
    new_status        TEXT NOT NULL,
    performed_by      TEXT NOT NULL,
    performed_by_role TEXT NOT NULL,
    at                TEXT NOT NULL,
    notes             TEXT,
    approval_json     TEXT
);

CREATE TABLE IF NOT EXISTS notifications (
    notification_id TEXT PRIMARY KEY,
    recipient_id    TEXT NOT NULL,
    agency_id       TEXT NOT NULL,
    loan_id         TEXT NOT NULL,
    event           TEXT NOT NULL,
    title           TEXT NOT NULL,
    message         TEXT NOT NULL,
    link            TEXT,
    sent_at         TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS loans_agency_idx        ON loans(agency_id);
CREATE INDEX IF NOT EXISTS loans_status_idx        ON loans(agency_id, status);
CREATE INDEX IF NOT EXISTS loan_audit_loan_idx     ON loan_audit(loan_id);
CREATE INDEX IF NOT EXISTS agency_audit_agency_idx ON agency_audit(agency_id);
CREATE INDEX IF NOT EXISTS members_agency_idx      ON members(agency_id);
CREATE INDEX IF NOT EXISTS notif_recipient_idx     ON notifications(recipient_id);

PRAGMA user_version = 1;
";

/// Ledger (relational mirror) schema. One flat row per loan; overwritten in
/// place on every mirrored transition.
pub const LEDGER_SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS ledger_loans (
    loan_id     TEXT PRIMARY KEY,
    agency_id   TEXT NOT NULL,
    status      TEXT NOT NULL,
    approved_by TEXT,
    updated_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS ledger_agency_idx ON ledger_loans(agency_id);

PRAGMA user_version = 1;
";

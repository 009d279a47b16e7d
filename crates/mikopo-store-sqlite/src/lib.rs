//! SQLite backend for the Mikopo loan store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! pool without blocking the async runtime. Two independent databases are
//! involved: [`SqliteStore`] is the document-side primary (loans as JSON
//! documents plus append-only audit tables), and [`SqliteLedger`] is the flat
//! relational mirror used for billing and reporting.

mod encode;
mod ledger;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use ledger::SqliteLedger;
pub use store::SqliteStore;

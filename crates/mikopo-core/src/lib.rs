//! Core types and trait definitions for the Mikopo loan platform: the loan
//! lifecycle, the permission matrix, audit records, and the storage traits
//! the workflow is generic over.
//!
//! Deliberately free of HTTP and database dependencies; every other crate in
//! the workspace depends on this one.

// Native `async fn` in traits is fine here; the store traits spell out their
// `Send` bounds explicitly, so silence the advisory lint.
#![allow(async_fn_in_trait)]

pub mod actor;
pub mod agency;
pub mod audit;
pub mod entitlement;
pub mod error;
pub mod loan;
pub mod notification;
pub mod policy;
pub mod store;

pub use error::{Error, Result};

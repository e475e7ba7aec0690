//! SQLite backend for the allocation ledger.
//!
//! [`SqliteDatabase`] implements [`crate::traits::AllocationLedger`], and its transactions implement
//! [`crate::traits::LedgerTransaction`].
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::{SqliteDatabase, SqliteLedgerTransaction};
